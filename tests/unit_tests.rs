use coco_clean::checker::{
    annotations_without_image, degenerate_bboxes, images_without_annotations, out_of_bounds_bboxes,
};
use coco_clean::cleaner::{clean_annotations, clean_dataset};
use coco_clean::coco::{Annotation, Category, CocoDataset, Image};
use coco_clean::config::{default_output_path, validate_size, CleanOptions};
use coco_clean::conversion::{coco_bbox_to_yolo, convert_to_yolo_format, output_stems};
use coco_clean::error::CleanError;
use coco_clean::explorer::{annotations_per_image, bbox_stats, images_per_category, missing_fields};
use coco_clean::yolo_dataset::split_images;
use std::collections::HashSet;
use std::path::Path;

fn sample_images() -> Vec<Image> {
    vec![
        Image::new(1, "img1.jpg", 100, 100),
        Image::new(2, "img2.jpg", 50, 50),
        Image::new(3, "img3.jpg", 200, 200),
    ]
}

// 11 has a zero width box, 12 points at an image that does not exist
fn sample_annotations() -> Vec<Annotation> {
    vec![
        Annotation::new(10, 1, 1, [10.0, 10.0, 50.0, 50.0]),
        Annotation::new(11, 2, 1, [5.0, 5.0, 0.0, 20.0]),
        Annotation::new(12, 99, 1, [0.0, 0.0, 10.0, 10.0]),
    ]
}

fn ids(annotations: &[&Annotation]) -> Vec<i64> {
    annotations.iter().map(|ann| ann.id).collect()
}

fn image_ids(images: &[&Image]) -> Vec<i64> {
    images.iter().map(|image| image.id).collect()
}

fn is_subset_of<T>(subset: &[&T], set: &[T]) -> bool {
    subset
        .iter()
        .all(|item| set.iter().any(|candidate| std::ptr::eq(*item, candidate)))
}

#[test]
fn test_annotations_without_image_detects_missing() {
    let images = sample_images();
    let annotations = sample_annotations();

    let result = annotations_without_image(&annotations, &images);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].image_id, 99);
}

#[test]
fn test_degenerate_bboxes_detects_zero_width() {
    let annotations = sample_annotations();

    let result = degenerate_bboxes(&annotations).unwrap();

    assert_eq!(ids(&result), vec![11]);
    assert_eq!(result[0].bbox, vec![5.0, 5.0, 0.0, 20.0]);
}

#[test]
fn test_degenerate_bboxes_treats_every_non_positive_side_alike() {
    let annotations = vec![
        Annotation::new(1, 1, 1, [0.0, 0.0, 0.0, 0.0]),
        Annotation::new(2, 1, 1, [0.0, 0.0, 10.0, 0.0]),
        Annotation::new(3, 1, 1, [0.0, 0.0, 0.0, 10.0]),
        Annotation::new(4, 1, 1, [0.0, 0.0, -5.0, 10.0]),
        Annotation::new(5, 1, 1, [0.0, 0.0, 10.0, -1.0]),
        Annotation::new(6, 1, 1, [0.0, 0.0, 0.5, 0.5]),
    ];

    let result = degenerate_bboxes(&annotations).unwrap();

    assert_eq!(ids(&result), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_degenerate_bboxes_rejects_short_bbox() {
    let mut annotation = Annotation::new(7, 1, 1, [0.0, 0.0, 10.0, 10.0]);
    annotation.bbox = vec![0.0, 0.0, 10.0];

    let err = degenerate_bboxes(&[annotation]).unwrap_err();

    match err {
        CleanError::MalformedRecord { kind, id, .. } => {
            assert_eq!(kind, "annotation");
            assert_eq!(id, 7);
        }
        other => panic!("expected MalformedRecord, got {:?}", other),
    }
}

#[test]
fn test_images_without_annotations_detects_unreferenced() {
    let images = sample_images();
    let annotations = sample_annotations();

    let result = images_without_annotations(&images, &annotations);

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, 3);
}

#[test]
fn test_images_without_annotations_all_returned_when_no_annotations() {
    let images = sample_images();

    let result = images_without_annotations(&images, &[]);

    assert_eq!(result.len(), images.len());
    let names: HashSet<&str> = result.iter().map(|image| image.file_name.as_str()).collect();
    assert_eq!(names, HashSet::from(["img1.jpg", "img2.jpg", "img3.jpg"]));
}

#[test]
fn test_images_without_annotations_empty_images() {
    let annotations = sample_annotations();

    assert!(images_without_annotations(&[], &annotations).is_empty());
}

#[test]
fn test_queries_return_subsets_of_their_input() {
    let images = sample_images();
    let annotations = sample_annotations();

    assert!(is_subset_of(
        &degenerate_bboxes(&annotations).unwrap(),
        &annotations
    ));
    assert!(is_subset_of(
        &annotations_without_image(&annotations, &images),
        &annotations
    ));
    assert!(is_subset_of(
        &images_without_annotations(&images, &annotations),
        &images
    ));
}

#[test]
fn test_no_false_positives_on_well_formed_data() {
    let images = sample_images();
    let annotations = vec![
        Annotation::new(1, 1, 1, [0.0, 0.0, 10.0, 10.0]),
        Annotation::new(2, 2, 2, [1.0, 1.0, 0.1, 0.1]),
        Annotation::new(3, 3, 1, [5.0, 5.0, 100.0, 20.0]),
    ];

    assert!(degenerate_bboxes(&annotations).unwrap().is_empty());
    assert!(annotations_without_image(&annotations, &images).is_empty());
}

#[test]
fn test_clean_annotations_removes_bad_and_missing() {
    let cleaned = clean_annotations(&sample_annotations(), &sample_images()).unwrap();

    assert_eq!(cleaned.len(), 1);
    assert_eq!(cleaned[0].id, 10);
    assert_eq!(cleaned[0].bbox, vec![10.0, 10.0, 50.0, 50.0]);
}

#[test]
fn test_clean_annotations_without_images_drops_everything() {
    let cleaned = clean_annotations(&sample_annotations(), &[]).unwrap();

    assert!(cleaned.is_empty());
}

fn sample_dataset() -> CocoDataset {
    CocoDataset::new(
        sample_images(),
        sample_annotations(),
        vec![Category::new(1, "catA"), Category::new(2, "catB")],
    )
}

fn prune_options() -> CleanOptions {
    CleanOptions {
        prune_images: true,
        ..CleanOptions::default()
    }
}

#[test]
fn test_clean_dataset_prunes_images_orphaned_by_bbox_removal() {
    let (cleaned, report) = clean_dataset(sample_dataset(), &prune_options()).unwrap();

    // image 2 only had the degenerate box, so it goes too
    let image_ids: Vec<i64> = cleaned.images.iter().map(|image| image.id).collect();
    assert_eq!(image_ids, vec![1]);
    assert_eq!(report.degenerate_annotations, vec![11]);
    assert_eq!(report.orphan_annotations, vec![12]);
    assert_eq!(report.pruned_images, vec![2, 3]);
    assert!(report.deleted_files.is_empty());
    assert_eq!(cleaned.categories.len(), 2);
}

#[test]
fn test_clean_dataset_keeps_images_without_prune() {
    let (cleaned, report) = clean_dataset(sample_dataset(), &CleanOptions::default()).unwrap();

    assert_eq!(cleaned.images.len(), 3);
    assert_eq!(cleaned.annotations.len(), 1);
    assert!(report.pruned_images.is_empty());
    assert_eq!(report.removed_annotations(), 2);
}

#[test]
fn test_clean_dataset_is_idempotent() {
    for options in [CleanOptions::default(), prune_options()] {
        let (once, _) = clean_dataset(sample_dataset(), &options).unwrap();
        let (twice, report) = clean_dataset(once.clone(), &options).unwrap();

        assert_eq!(once, twice);
        assert!(report.is_clean());
    }
}

#[test]
fn test_clean_dataset_establishes_referential_closure() {
    let mut dataset = sample_dataset();
    dataset
        .annotations
        .push(Annotation::new(13, 3, 2, [1.0, 1.0, 2.0, 2.0]));
    dataset
        .annotations
        .push(Annotation::new(14, 42, 2, [1.0, 1.0, 2.0, 2.0]));

    let (cleaned, _) = clean_dataset(dataset, &prune_options()).unwrap();

    let image_ids: HashSet<i64> = cleaned.images.iter().map(|image| image.id).collect();
    for ann in &cleaned.annotations {
        assert!(image_ids.contains(&ann.image_id));
        assert!(!ann.has_degenerate_bbox().unwrap());
    }
    assert_eq!(cleaned.annotations.len(), 2);
}

#[test]
fn test_clean_dataset_without_images_yields_no_annotations() {
    let dataset = CocoDataset::new(Vec::new(), sample_annotations(), Vec::new());

    let (cleaned, report) = clean_dataset(dataset, &CleanOptions::default()).unwrap();

    assert!(cleaned.annotations.is_empty());
    assert_eq!(report.degenerate_annotations, vec![11]);
    assert_eq!(report.orphan_annotations, vec![10, 12]);
}

#[test]
fn test_out_of_bounds_bboxes_detects_invalid() {
    let images = sample_images();
    let annotations = vec![
        Annotation::new(10, 1, 1, [0.0, 0.0, 50.0, 50.0]),
        Annotation::new(11, 1, 2, [10.0, 10.0, 20.0, 20.0]),
        Annotation::new(12, 2, 1, [5.0, 5.0, 0.0, 20.0]),
        Annotation::new(13, 2, 1, [40.0, 5.0, 20.0, 20.0]),
        Annotation::new(14, 3, 1, [-1.0, 5.0, 20.0, 20.0]),
        Annotation::new(15, 99, 1, [-1.0, 5.0, 20.0, 20.0]),
    ];

    let result = out_of_bounds_bboxes(&annotations, &images).unwrap();

    assert_eq!(ids(&result), vec![12, 13, 14]);
}

#[test]
fn test_out_of_bounds_bboxes_skips_images_without_size() {
    let mut images = sample_images();
    images[0].width = None;
    let annotations = vec![
        Annotation::new(10, 1, 1, [-5.0, 0.0, 500.0, 50.0]),
        Annotation::new(11, 2, 1, [40.0, 5.0, 20.0, 20.0]),
        Annotation::new(12, 3, 1, [0.0, 0.0, 10.0, 10.0]),
    ];

    let result = out_of_bounds_bboxes(&annotations, &images).unwrap();

    assert_eq!(ids(&result), vec![11]);
}

#[test]
fn test_annotations_per_image_counts_correctly() {
    let annotations = vec![
        Annotation::new(10, 1, 1, [0.0, 0.0, 50.0, 50.0]),
        Annotation::new(11, 1, 2, [10.0, 10.0, 20.0, 20.0]),
        Annotation::new(12, 2, 1, [5.0, 5.0, 0.0, 20.0]),
    ];

    let counts = annotations_per_image(&annotations);

    assert_eq!(counts.get(&1), Some(&2));
    assert_eq!(counts.get(&2), Some(&1));
    assert!(annotations_per_image(&[]).is_empty());
}

#[test]
fn test_images_per_category_counts_distinct_images() {
    let annotations = vec![
        Annotation::new(10, 1, 1, [0.0, 0.0, 50.0, 50.0]),
        Annotation::new(11, 1, 2, [10.0, 10.0, 20.0, 20.0]),
        Annotation::new(12, 2, 1, [5.0, 5.0, 0.0, 20.0]),
        Annotation::new(13, 2, 1, [5.0, 5.0, 3.0, 20.0]),
    ];
    let categories = vec![Category::new(1, "catA"), Category::new(2, "catB")];

    let counts = images_per_category(&annotations, &categories);

    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0].category, "catA");
    assert_eq!(counts[0].num_images, 2);
    assert_eq!(counts[1].category, "catB");
    assert_eq!(counts[1].num_images, 1);
}

#[test]
fn test_bbox_stats_covers_width_height_and_area() {
    let annotations = vec![
        Annotation::new(10, 1, 1, [0.0, 0.0, 50.0, 50.0]),
        Annotation::new(11, 1, 2, [10.0, 10.0, 20.0, 20.0]),
        Annotation::new(12, 2, 1, [5.0, 5.0, 0.0, 20.0]),
    ];

    let stats = bbox_stats(&annotations).unwrap();

    assert_eq!(stats.width.count, 3);
    assert_eq!(stats.width.min, 0.0);
    assert_eq!(stats.width.max, 50.0);
    assert_eq!(stats.height.min, 20.0);
    assert_eq!(stats.area.max, 2500.0);
    assert_eq!(stats.area.min, 0.0);
}

#[test]
fn test_missing_fields_counts_incomplete_records() {
    let mut dataset = sample_dataset();
    dataset.images[0].width = None;
    dataset.annotations[0].bbox.clear();
    dataset.annotations[1].category_id = None;

    let missing = missing_fields(&dataset);

    assert_eq!(missing.images_without_size, 1);
    assert_eq!(missing.annotations_with_bad_bbox, 1);
    assert_eq!(missing.annotations_without_category, 1);
}

#[test]
fn test_coco_bbox_to_yolo() {
    let ann = Annotation::new(1, 1, 3, [10.0, 20.0, 30.0, 40.0]);

    let yolo = coco_bbox_to_yolo(&ann.bbox().unwrap(), 100, 200);

    assert_eq!(yolo.x_center, 0.25);
    assert_eq!(yolo.y_center, 0.2);
    assert_eq!(yolo.width, 0.3);
    assert_eq!(yolo.height, 0.2);
}

#[test]
fn test_convert_to_yolo_format() {
    let image = Image::new(1, "image.jpg", 100, 200);
    let first = Annotation::new(1, 1, 3, [10.0, 20.0, 30.0, 40.0]);
    let second = Annotation::new(2, 1, 0, [0.0, 0.0, 100.0, 200.0]);

    let yolo_data = convert_to_yolo_format(&image, &[&first, &second]).unwrap();

    assert_eq!(
        yolo_data,
        "3 0.250000 0.200000 0.300000 0.200000\n0 0.500000 0.500000 1.000000 1.000000\n"
    );
}

#[test]
fn test_convert_to_yolo_format_requires_image_size() {
    let mut image = Image::new(5, "image.jpg", 100, 200);
    image.height = None;
    let ann = Annotation::new(1, 5, 3, [10.0, 20.0, 30.0, 40.0]);

    let err = convert_to_yolo_format(&image, &[&ann]).unwrap_err();

    assert!(matches!(
        err,
        CleanError::MalformedRecord {
            kind: "image",
            id: 5,
            ..
        }
    ));
}

#[test]
fn test_validate_size() {
    assert!(validate_size("0.5").is_ok());
    assert!(validate_size("1.0").is_ok());
    assert!(validate_size("0.0").is_ok());
    assert!(validate_size("-0.1").is_err());
    assert!(validate_size("1.1").is_err());
    assert!(validate_size("abc").is_err());
}

#[test]
fn test_default_output_path() {
    assert_eq!(
        default_output_path(Path::new("data/_annotations.coco.json")),
        Path::new("data/_annotations_clean.coco.json")
    );
    assert_eq!(
        default_output_path(Path::new("train.json")),
        Path::new("train_clean.json")
    );
}

#[test]
fn test_split_images() {
    let images: Vec<Image> = (1..=5)
        .map(|id| Image::new(id, format!("image{}.jpg", id), 10, 10))
        .collect();

    let split_data = split_images(&images, 0.2, 0.2, 42);

    assert_eq!(split_data.train_images.len(), 3);
    assert_eq!(split_data.val_images.len(), 1);
    assert_eq!(split_data.test_images.len(), 1);

    let mut all: Vec<i64> = split_data
        .train_images
        .iter()
        .chain(&split_data.val_images)
        .chain(&split_data.test_images)
        .map(|image| image.id)
        .collect();
    all.sort();
    assert_eq!(all, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_split_images_is_reproducible() {
    let images: Vec<Image> = (1..=20)
        .map(|id| Image::new(id, format!("image{}.jpg", id), 10, 10))
        .collect();

    let first = split_images(&images, 0.2, 0.1, 7);
    let second = split_images(&images, 0.2, 0.1, 7);

    assert_eq!(image_ids(&first.train_images), image_ids(&second.train_images));
    assert_eq!(image_ids(&first.val_images), image_ids(&second.val_images));
    assert_eq!(image_ids(&first.test_images), image_ids(&second.test_images));
    assert_eq!(first.test_images.len(), 2);
    assert_eq!(first.val_images.len(), 4);
}

#[test]
fn test_output_stems_disambiguates_clashes() {
    let images = vec![
        Image::new(1, "a.jpg", 10, 10),
        Image::new(2, "a.png", 10, 10),
        Image::new(3, "b.jpg", 10, 10),
        Image::new(4, "cat_jpg_rf.0123abcd.jpg", 10, 10),
    ];
    let refs: Vec<&Image> = images.iter().collect();

    let stems = output_stems(&refs);

    assert_eq!(stems[&1], "a_1");
    assert_eq!(stems[&2], "a_2");
    assert_eq!(stems[&3], "b");
    assert_eq!(stems[&4], "cat_jpg_rf.0123abcd");
}
