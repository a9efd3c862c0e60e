mod tests {
    use dashmap::DashMap;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::VecDeque;
    use std::fs;

    use mask2yolo::config::{parse_class_pair, Format, MaskArgs, OverlayArgs};
    use mask2yolo::conversion::{convert_mask_to_labels, format_label_line};
    use mask2yolo::overlay::{blend_pixel, process_voc_folder, render_overlay};
    use mask2yolo::rle::Rle;
    use mask2yolo::segment::{BoxSegmenter, SegmentResult};
    use mask2yolo::types::{
        BinaryMask, BoundingBox, ClassMap, MaskStats, OverlayStats, Split,
    };
    use mask2yolo::utils::read_class_map_json;
    use mask2yolo::voc::read_boxes;
    use mask2yolo::{process_dataset, setup_output_directories};

    /// Scripted segmenter that hands out pre-built masks in order.
    struct FakeSegmenter {
        masks: VecDeque<BinaryMask>,
    }

    impl FakeSegmenter {
        fn new(masks: Vec<BinaryMask>) -> Self {
            Self {
                masks: masks.into(),
            }
        }
    }

    impl BoxSegmenter for FakeSegmenter {
        fn set_image(&mut self, _image: &RgbImage) -> SegmentResult<()> {
            Ok(())
        }

        fn predict_box(&mut self, _bbox: &BoundingBox) -> SegmentResult<BinaryMask> {
            match self.masks.pop_front() {
                Some(mask) => Ok(mask),
                None => Err("no scripted mask left".into()),
            }
        }
    }

    fn rectangle_mask(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> BinaryMask {
        BinaryMask::from_fn(width, height, |x, y| {
            (x0..x1).contains(&x) && (y0..y1).contains(&y)
        })
    }

    #[test]
    fn test_rle_bbox_matches_known_rectangle() {
        let mask = rectangle_mask(20, 10, 3, 2, 8, 6);
        let rle = Rle::encode(&mask);

        assert_eq!(rle.to_bbox(), [3.0, 2.0, 5.0, 4.0]);
        assert_eq!(rle.area(), 20);
    }

    #[test]
    fn test_rle_round_trip() {
        let mask = BinaryMask::from_fn(9, 7, |x, y| (x * 31 + y * 7) % 3 == 0);
        let rle = Rle::encode(&mask);

        assert_eq!(rle.decode(), mask);
        assert_eq!(rle.area() as usize, mask.count_ones());
    }

    #[test]
    fn test_rle_multi_column_run_spans_full_height() {
        // Columns 2 and 3 fully set form one run crossing a column boundary
        let mask = BinaryMask::from_fn(8, 4, |x, _| x == 2 || x == 3);
        let rle = Rle::encode(&mask);

        assert_eq!(rle.to_bbox(), [2.0, 0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_rle_empty_mask() {
        let rle = Rle::encode(&BinaryMask::new(5, 5));

        assert_eq!(rle.to_bbox(), [0.0, 0.0, 0.0, 0.0]);
        assert_eq!(rle.area(), 0);
    }

    #[test]
    fn test_format_label_line() {
        let bbox = [3.0, 2.0, 5.0, 4.0];

        assert_eq!(format_label_line(3, &bbox, Format::Bbox), "3 3 2 5 4\n");
        assert_eq!(
            format_label_line(1, &[1.0, 2.0, 3.0, 4.0], Format::Polygon),
            "1 1 2 4 2 4 6 1 6\n"
        );
    }

    #[test]
    fn test_parse_class_pair() {
        assert_eq!(parse_class_pair("0:0"), Ok((0, 0)));
        assert_eq!(parse_class_pair("12:3"), Ok((12, 3)));
        assert!(parse_class_pair("abc").is_err());
        assert!(parse_class_pair("300:1").is_err());
        assert!(parse_class_pair("1:x").is_err());
    }

    #[test]
    fn test_class_map_ordering_and_json() {
        let class_map = ClassMap::from_pairs(&[(9, 1), (1, 2)]);
        let entries: Vec<_> = class_map.iter().collect();
        assert_eq!(entries, vec![(1, 2), (9, 1)]);

        let temp_dir = tempfile::tempdir().unwrap();
        let json_path = temp_dir.path().join("classes.json");
        fs::write(&json_path, r#"{"0": 0, "2": 5}"#).unwrap();

        let class_map = read_class_map_json(&json_path).unwrap();
        let entries: Vec<_> = class_map.iter().collect();
        assert_eq!(entries, vec![(0, 0), (2, 5)]);
    }

    #[test]
    fn test_convert_mask_to_labels() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mask_path = temp_dir.path().join("img1_mask.png");
        let label_path = temp_dir.path().join("img1.txt");

        let mask_image = GrayImage::from_fn(20, 10, |x, y| {
            if (3..8).contains(&x) && (2..6).contains(&y) {
                Luma([1u8])
            } else {
                Luma([0u8])
            }
        });
        mask_image.save(&mask_path).unwrap();

        let class_map = ClassMap::from_pairs(&[(1, 0), (2, 7)]);
        let class_counts = DashMap::new();
        let stats = MaskStats::default();
        convert_mask_to_labels(
            &mask_path,
            &label_path,
            &class_map,
            Format::Bbox,
            &class_counts,
            &stats,
        )
        .unwrap();

        let content = fs::read_to_string(&label_path).unwrap();
        assert_eq!(content, "0 3 2 5 4\n");

        // Class 7 had no matching pixels, so no line and no count
        assert_eq!(stats.labels_written(), 1);
        assert_eq!(stats.classes_skipped_empty(), 1);
        assert_eq!(*class_counts.get(&0).unwrap(), 1);
        assert!(class_counts.get(&7).is_none());
    }

    #[test]
    fn test_bounding_box_contained_in() {
        let inside = BoundingBox {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 10.0,
            ymax: 10.0,
        };
        let negative = BoundingBox {
            xmin: -1.0,
            ymin: 0.0,
            xmax: 5.0,
            ymax: 5.0,
        };
        let outside = BoundingBox {
            xmin: 20.0,
            ymin: 20.0,
            xmax: 30.0,
            ymax: 30.0,
        };
        let too_wide = BoundingBox {
            xmin: 0.0,
            ymin: 0.0,
            xmax: 10.5,
            ymax: 5.0,
        };

        assert!(inside.contained_in(10, 10));
        assert!(!negative.contained_in(10, 10));
        assert!(!outside.contained_in(10, 10));
        assert!(!too_wide.contained_in(10, 10));
    }

    #[test]
    fn test_blend_pixel_fifty_fifty() {
        let blended = blend_pixel(Rgb([100, 200, 30]), [50, 100, 255]);

        // 142.5 truncates to 142
        assert_eq!(blended, Rgb([75, 150, 142]));
    }

    #[test]
    fn test_out_of_bounds_box_is_skipped() {
        let image = RgbImage::from_pixel(10, 10, Rgb([10, 20, 30]));
        let boxes = [BoundingBox {
            xmin: 20.0,
            ymin: 20.0,
            xmax: 30.0,
            ymax: 30.0,
        }];
        let mut segmenter = FakeSegmenter::new(vec![]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut stats = OverlayStats::default();

        let overlay =
            render_overlay(&mut segmenter, &image, &boxes, &mut rng, &mut stats).unwrap();

        assert_eq!(overlay, image);
        assert_eq!(stats.boxes_skipped_out_of_bounds, 1);
        assert_eq!(stats.boxes_rendered, 0);
        assert_eq!(stats.boxes_failed, 0);
    }

    #[test]
    fn test_empty_mask_leaves_image_unchanged() {
        let image = RgbImage::from_pixel(10, 10, Rgb([10, 20, 30]));
        let boxes = [BoundingBox {
            xmin: 2.0,
            ymin: 2.0,
            xmax: 8.0,
            ymax: 8.0,
        }];
        let mut segmenter = FakeSegmenter::new(vec![BinaryMask::new(10, 10)]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut stats = OverlayStats::default();

        let overlay =
            render_overlay(&mut segmenter, &image, &boxes, &mut rng, &mut stats).unwrap();

        assert_eq!(overlay, image);
        assert_eq!(stats.boxes_skipped_empty_mask, 1);
        assert_eq!(stats.boxes_rendered, 0);
    }

    #[test]
    fn test_blending_applies_only_at_mask_pixels() {
        let image = RgbImage::from_pixel(10, 10, Rgb([10, 20, 30]));
        let boxes = [BoundingBox {
            xmin: 2.0,
            ymin: 2.0,
            xmax: 8.0,
            ymax: 8.0,
        }];
        let mut mask = BinaryMask::new(10, 10);
        mask.set(4, 4, true);
        mask.set(5, 5, true);
        let mut segmenter = FakeSegmenter::new(vec![mask]);
        let mut rng = StdRng::seed_from_u64(7);
        let mut stats = OverlayStats::default();

        let overlay =
            render_overlay(&mut segmenter, &image, &boxes, &mut rng, &mut stats).unwrap();

        // The color comes from the same seeded generator state
        let expected_color: [u8; 3] = StdRng::seed_from_u64(7).gen();
        let expected_pixel = blend_pixel(Rgb([10, 20, 30]), expected_color);
        assert_eq!(*overlay.get_pixel(4, 4), expected_pixel);
        assert_eq!(*overlay.get_pixel(5, 5), expected_pixel);
        assert_eq!(*overlay.get_pixel(0, 0), Rgb([10, 20, 30]));
        assert_eq!(*overlay.get_pixel(4, 5), Rgb([10, 20, 30]));
        assert_eq!(stats.boxes_rendered, 1);
    }

    #[test]
    fn test_read_boxes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let xml_path = temp_dir.path().join("a.xml");
        fs::write(
            &xml_path,
            r#"<annotation>
                <object>
                    <name>cat</name>
                    <bndbox><xmin>1</xmin><ymin>2.5</ymin><xmax>30</xmax><ymax>40</ymax></bndbox>
                </object>
                <object><name>no-box</name></object>
            </annotation>"#,
        )
        .unwrap();

        let boxes = read_boxes(&xml_path).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(
            boxes[0],
            BoundingBox {
                xmin: 1.0,
                ymin: 2.5,
                xmax: 30.0,
                ymax: 40.0,
            }
        );
    }

    #[test]
    fn test_read_boxes_rejects_bad_input() {
        let temp_dir = tempfile::tempdir().unwrap();

        let malformed = temp_dir.path().join("malformed.xml");
        fs::write(&malformed, "this is not xml <<<").unwrap();
        assert!(read_boxes(&malformed).is_err());

        let bad_coord = temp_dir.path().join("bad_coord.xml");
        fs::write(
            &bad_coord,
            r#"<annotation><object><bndbox>
                <xmin>abc</xmin><ymin>0</ymin><xmax>5</xmax><ymax>5</ymax>
            </bndbox></object></annotation>"#,
        )
        .unwrap();
        assert!(read_boxes(&bad_coord).is_err());
    }

    #[test]
    fn test_unparsable_annotation_skips_image_and_continues() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dataset_dir = temp_dir.path().join("dataset");
        let image_dir = dataset_dir.join("JPEGImages");
        let annotation_dir = dataset_dir.join("Annotations");
        let output_dir = temp_dir.path().join("output");
        fs::create_dir_all(&image_dir).unwrap();
        fs::create_dir_all(&annotation_dir).unwrap();

        let image = RgbImage::from_pixel(4, 4, Rgb([128, 128, 128]));
        image.save(image_dir.join("a.jpg")).unwrap();
        image.save(image_dir.join("b.jpg")).unwrap();
        image.save(image_dir.join("c.jpg")).unwrap();

        fs::write(annotation_dir.join("a.xml"), "broken <<<").unwrap();
        fs::write(
            annotation_dir.join("b.xml"),
            r#"<annotation><object><bndbox>
                <xmin>0</xmin><ymin>0</ymin><xmax>4</xmax><ymax>4</ymax>
            </bndbox></object></annotation>"#,
        )
        .unwrap();
        // c.jpg has no annotation at all

        let mut mask = BinaryMask::new(4, 4);
        mask.set(1, 1, true);
        let mut segmenter = FakeSegmenter::new(vec![mask]);

        let args = OverlayArgs {
            dataset_dir: dataset_dir.to_string_lossy().into_owned(),
            output_dir: output_dir.to_string_lossy().into_owned(),
            encoder: "unused.onnx".to_string(),
            decoder: "unused.onnx".to_string(),
            threads: 1,
            seed: 42,
        };
        let stats = process_voc_folder(&args, &mut segmenter).unwrap();

        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_processed, 1);
        assert_eq!(stats.files_skipped_missing_annotation, 1);
        assert_eq!(stats.boxes_rendered, 1);
        assert!(!output_dir.join("a.jpg").exists());
        assert!(output_dir.join("b.jpg").exists());
        assert!(!output_dir.join("c.jpg").exists());
    }

    #[test]
    fn test_setup_output_directories() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_root = temp_dir.path().join("out");

        let output_dirs = setup_output_directories(&output_root).unwrap();

        for split in Split::ALL {
            let (labels_dir, images_dir) = output_dirs.for_split(split);
            assert!(labels_dir.is_dir());
            assert!(images_dir.is_dir());
            assert!(labels_dir.starts_with(output_root.join(split.as_str())));
            assert!(images_dir.starts_with(output_root.join(split.as_str())));
        }
    }

    #[test]
    fn test_process_dataset_end_to_end() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path().join("root");
        let output_root = temp_dir.path().join("out");
        let train_dir = root.join("train");
        fs::create_dir_all(&train_dir).unwrap();

        let mask_image = GrayImage::from_fn(20, 10, |x, y| {
            if (3..8).contains(&x) && (2..6).contains(&y) {
                Luma([1u8])
            } else {
                Luma([0u8])
            }
        });
        mask_image.save(train_dir.join("img1_mask.png")).unwrap();
        RgbImage::from_pixel(20, 10, Rgb([40, 40, 40]))
            .save(train_dir.join("img1.jpg"))
            .unwrap();

        let output_dirs = setup_output_directories(&output_root).unwrap();
        let args = MaskArgs {
            root_dir: root.to_string_lossy().into_owned(),
            output_dir: output_root.to_string_lossy().into_owned(),
            class_map: vec![(1, 0)],
            class_map_json: None,
            output_format: Format::Bbox,
        };

        // test/ and valid/ directories are absent and get skipped
        process_dataset(&args, &root, &output_dirs).unwrap();

        let label_content =
            fs::read_to_string(output_root.join("train/labels/img1.txt")).unwrap();
        assert_eq!(label_content, "0 3 2 5 4\n");
        assert!(output_root.join("train/images/img1.jpg").exists());
    }
}
