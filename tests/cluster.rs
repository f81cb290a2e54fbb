use promptore::nlp::cluster::{cluster_with_k, elbow_curve};

fn two_blobs() -> Vec<Vec<f32>> {
    vec![
        vec![0.0, 0.1],
        vec![0.2, 0.0],
        vec![0.1, 0.2],
        vec![10.0, 10.1],
        vec![10.2, 9.9],
        vec![9.9, 10.2],
    ]
}

#[test]
fn well_separated_points_split_cleanly() {
    let labels = cluster_with_k(&two_blobs(), 2, 42).unwrap();
    assert_eq!(labels.len(), 6);
    assert!(labels[..3].iter().all(|l| *l == labels[0]));
    assert!(labels[3..].iter().all(|l| *l == labels[3]));
    assert_ne!(labels[0], labels[3]);
}

#[test]
fn clustering_is_reproducible_for_a_seed() {
    let first = cluster_with_k(&two_blobs(), 3, 7).unwrap();
    let second = cluster_with_k(&two_blobs(), 3, 7).unwrap();
    assert_eq!(first, second);
}

#[test]
fn elbow_wcss_does_not_increase() {
    let curve = elbow_curve(&two_blobs(), 5, 42).unwrap();
    let ks: Vec<usize> = curve.iter().map(|p| p.k).collect();
    assert_eq!(ks, vec![1, 2, 3, 4]);
    for pair in curve.windows(2) {
        assert!(pair[1].wcss <= pair[0].wcss + 1e-9, "{curve:?}");
    }
    assert!(curve[1].wcss < curve[0].wcss / 10.0);
}

#[test]
fn elbow_range_is_capped_by_point_count() {
    let curve = elbow_curve(&two_blobs()[..2], 10, 42).unwrap();
    assert_eq!(curve.iter().map(|p| p.k).collect::<Vec<_>>(), vec![1, 2]);
}
