use image::RgbImage;
use kibo_vision::{CropConfig, DecodeConfig, Detection, LabelTable, crop_to_quad, decode, non_max_suppression};
use proptest::prelude::*;

fn proptest_config() -> ProptestConfig {
  ProptestConfig {
    cases: 64,
    ..ProptestConfig::default()
  }
}

/// (类别数, 槽位数, 张量)，数值范围故意超出 [0, 1]
fn arb_tensor() -> impl Strategy<Value = (usize, usize, Vec<f32>)> {
  (1usize..4, 1usize..16).prop_flat_map(|(classes, slots)| {
    (
      Just(classes),
      Just(slots),
      prop::collection::vec(-0.5f32..1.5, (4 + classes) * slots),
    )
  })
}

fn arb_detection() -> impl Strategy<Value = Detection> {
  (0.0f32..0.9, 0.0f32..0.9, 0.01f32..0.5, 0.01f32..0.5, 0.0f32..1.0, 0usize..3).prop_map(
    |(x, y, w, h, confidence, class_id)| Detection {
      xmin: x,
      ymin: y,
      xmax: (x + w).min(1.0),
      ymax: (y + h).min(1.0),
      confidence,
      class_id,
      label: format!("class_{class_id}"),
    },
  )
}

fn arb_image() -> impl Strategy<Value = RgbImage> {
  (1u32..24, 1u32..24).prop_flat_map(|(w, h)| {
    prop::collection::vec(any::<u8>(), (w * h * 3) as usize)
      .prop_filter_map("像素数量不匹配", move |data| RgbImage::from_raw(w, h, data))
  })
}

proptest! {
  #![proptest_config(proptest_config())]

  #[test]
  fn decoded_boxes_are_normalized_and_confident((classes, slots, raw) in arb_tensor()) {
    let config = DecodeConfig::new(classes, slots);
    let result = decode(&raw, &config, &LabelTable::default()).expect("decode");

    for item in &result {
      prop_assert!(0.0 <= item.xmin && item.xmin < item.xmax && item.xmax <= 1.0);
      prop_assert!(0.0 <= item.ymin && item.ymin < item.ymax && item.ymax <= 1.0);
      prop_assert!(item.confidence >= config.confidence_threshold);
      prop_assert!(item.class_id < classes);
    }
    for pair in result.items.windows(2) {
      prop_assert!(pair[0].confidence >= pair[1].confidence);
    }
  }

  #[test]
  fn survivors_of_same_class_do_not_overlap(
    detections in prop::collection::vec(arb_detection(), 0..20),
    threshold in 0.1f32..0.9,
  ) {
    let result = non_max_suppression(detections, threshold);
    for (i, a) in result.iter().enumerate() {
      for b in result.iter().skip(i + 1) {
        if a.class_id == b.class_id {
          prop_assert!(a.iou(b) <= threshold);
        }
      }
    }
  }

  #[test]
  fn nms_is_idempotent(
    detections in prop::collection::vec(arb_detection(), 0..20),
    threshold in 0.1f32..0.9,
  ) {
    let once = non_max_suppression(detections, threshold);
    let twice = non_max_suppression(once.clone().into_vec(), threshold);
    prop_assert_eq!(once, twice);
  }

  #[test]
  fn iou_is_symmetric_and_bounded(a in arb_detection(), b in arb_detection()) {
    let ab = a.iou(&b);
    prop_assert!((ab - b.iou(&a)).abs() < 1e-6);
    prop_assert!((0.0..=1.0 + 1e-6).contains(&ab));
    prop_assert!((a.iou(&a) - 1.0).abs() < 1e-5);
  }

  #[test]
  fn crop_never_grows_or_empties_the_image(image in arb_image(), legacy in any::<bool>()) {
    let config = if legacy { CropConfig::legacy() } else { CropConfig::default() };
    let out = crop_to_quad(&image, &config);

    prop_assert!(out.width() > 0 && out.height() > 0);
    prop_assert!(out.width() <= image.width() && out.height() <= image.height());
  }
}
