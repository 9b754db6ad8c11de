use kibo_vision::{DecodeConfig, DecodeError, Detection, LabelTable, decode, non_max_suppression};

/// 构造 `[4 + C, N]` 张量，`slots` 中每项为 (槽位, [cx, cy, w, h], 类别概率)
fn tensor(num_classes: usize, num_slots: usize, slots: &[(usize, [f32; 4], Vec<f32>)]) -> Vec<f32> {
  let mut raw = vec![0.0; (4 + num_classes) * num_slots];
  for (slot, bbox, probs) in slots {
    for (row, value) in bbox.iter().chain(probs.iter()).enumerate() {
      raw[row * num_slots + slot] = *value;
    }
  }
  raw
}

#[test]
fn centered_full_frame_box() {
  let raw = tensor(2, 4, &[(1, [0.5, 0.5, 1.0, 1.0], vec![0.05, 0.9])]);
  let labels = LabelTable::new(["treasure", "landmark"]);

  let result = decode(&raw, &DecodeConfig::new(2, 4), &labels).expect("decode");

  assert_eq!(result.len(), 1);
  let item = &result.items[0];
  assert_eq!(item.class_id, 1);
  assert_eq!(item.label, "landmark");
  assert!((item.confidence - 0.9).abs() < 1e-6);
  assert_eq!(
    (item.xmin, item.ymin, item.xmax, item.ymax),
    (0.0, 0.0, 1.0, 1.0)
  );
}

#[test]
fn overlapping_same_class_keeps_higher_confidence() {
  // 两个 0.4x0.4 的框水平偏移 0.1：交集 0.3x0.4，并集 0.2，IoU = 0.6
  let raw = tensor(
    1,
    2,
    &[
      (0, [0.3, 0.5, 0.4, 0.4], vec![0.7]),
      (1, [0.4, 0.5, 0.4, 0.4], vec![0.85]),
    ],
  );

  let result = decode(&raw, &DecodeConfig::new(1, 2), &LabelTable::default()).expect("decode");

  assert_eq!(result.len(), 1);
  assert!((result.items[0].confidence - 0.85).abs() < 1e-6);
  assert_eq!(result.items[0].label, "Unknown_Class_0");
}

#[test]
fn overlapping_different_classes_both_survive() {
  let raw = tensor(
    2,
    2,
    &[
      (0, [0.5, 0.5, 0.4, 0.4], vec![0.9, 0.0]),
      (1, [0.51, 0.5, 0.4, 0.4], vec![0.0, 0.8]),
    ],
  );

  let result = decode(&raw, &DecodeConfig::new(2, 2), &LabelTable::default()).expect("decode");

  assert_eq!(result.len(), 2);
  assert!(result.items[0].iou(&result.items[1]) > 0.9);
  assert_eq!(result.items[0].class_id, 0);
  assert_eq!(result.items[1].class_id, 1);
}

#[test]
fn label_table_shorter_than_class_id() {
  let raw = tensor(3, 1, &[(0, [0.5, 0.5, 0.2, 0.2], vec![0.0, 0.1, 0.95])]);
  let labels = LabelTable::new(["coin", "key"]);

  let result = decode(&raw, &DecodeConfig::new(3, 1), &labels).expect("decode");
  assert_eq!(result.items[0].label, "Unknown_Class_2");
}

#[test]
fn strict_profile_drops_mid_confidence() {
  let config = DecodeConfig {
    num_classes: 1,
    num_slots: 1,
    ..DecodeConfig::strict()
  };
  let raw = tensor(1, 1, &[(0, [0.5, 0.5, 0.2, 0.2], vec![0.6])]);

  assert!(decode(&raw, &config, &LabelTable::default()).expect("decode").is_empty());
  assert_eq!(
    decode(&raw, &DecodeConfig::new(1, 1), &LabelTable::default())
      .expect("decode")
      .len(),
    1
  );
}

#[test]
fn reference_model_shape() {
  let config = DecodeConfig::default();
  assert_eq!(config.expected_len(), Some(15 * 4725));

  let raw = vec![0.0; 15 * 4725];
  assert!(decode(&raw, &config, &LabelTable::default()).expect("decode").is_empty());

  let short = vec![0.0; 14 * 4725];
  assert!(matches!(
    decode(&short, &config, &LabelTable::default()),
    Err(DecodeError::SizeMismatch { .. })
  ));
}

#[test]
fn output_is_sorted_by_confidence() {
  let raw = tensor(
    2,
    3,
    &[
      (0, [0.1, 0.1, 0.1, 0.1], vec![0.6, 0.0]),
      (1, [0.5, 0.5, 0.1, 0.1], vec![0.0, 0.95]),
      (2, [0.9, 0.9, 0.1, 0.1], vec![0.75, 0.0]),
    ],
  );

  let result = decode(&raw, &DecodeConfig::new(2, 3), &LabelTable::default()).expect("decode");
  let confidences: Vec<f32> = result.iter().map(|d| d.confidence).collect();
  assert_eq!(confidences, vec![0.95, 0.75, 0.6]);
}

#[test]
fn nms_output_is_stable_under_rerun() {
  let detections = vec![
    Detection {
      xmin: 0.1,
      ymin: 0.1,
      xmax: 0.4,
      ymax: 0.4,
      confidence: 0.9,
      class_id: 0,
      label: "coin".to_string(),
    },
    Detection {
      xmin: 0.12,
      ymin: 0.1,
      xmax: 0.42,
      ymax: 0.4,
      confidence: 0.8,
      class_id: 0,
      label: "coin".to_string(),
    },
    Detection {
      xmin: 0.6,
      ymin: 0.6,
      xmax: 0.9,
      ymax: 0.9,
      confidence: 0.7,
      class_id: 0,
      label: "coin".to_string(),
    },
  ];

  let once = non_max_suppression(detections, 0.45);
  assert_eq!(once.len(), 2);
  let twice = non_max_suppression(once.clone().into_vec(), 0.45);
  assert_eq!(once, twice);
}
