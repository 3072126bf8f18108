//! Tests for similarity ranking

use super::*;
use crate::key::{Mode, PitchClass};
use approx::assert_relative_eq;

fn full_record() -> DescriptorRecord {
    DescriptorRecord {
        tempo_bpm: Some(120.0),
        key: Some(PitchClass::C),
        mode: Some(Mode::Major),
        energy_rms: Some(0.5),
        brightness_hz: Some(1800.0),
        ..Default::default()
    }
}

fn weights() -> RankingWeights {
    RankingWeights::default()
}

#[test]
fn cosine_of_vector_with_itself_is_one() {
    let v = vec![0.3f32, -1.2, 4.4, 0.01];
    assert_relative_eq!(cosine_similarity(&v, &v).unwrap(), 1.0, epsilon = 1e-9);
}

#[test]
fn cosine_is_symmetric() {
    let a = vec![0.3f32, -1.2, 4.4];
    let b = vec![1.0f32, 0.2, -0.7];
    assert_relative_eq!(
        cosine_similarity(&a, &b).unwrap(),
        cosine_similarity(&b, &a).unwrap(),
        epsilon = 1e-12
    );
}

#[test]
fn cosine_of_opposed_vectors_is_minus_one() {
    let a = vec![1.0f32, 2.0];
    let b = vec![-1.0f32, -2.0];
    assert_relative_eq!(cosine_similarity(&a, &b).unwrap(), -1.0, epsilon = 1e-9);
}

#[test]
fn cosine_undefined_for_zero_or_mismatched_vectors() {
    assert!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]).is_none());
    assert!(cosine_similarity(&[], &[]).is_none());
    assert!(cosine_similarity(&[1.0], &[1.0, 2.0]).is_none());
}

#[test]
fn identical_records_score_one() {
    let query = full_record();
    let (score, has_signal) = descriptor_score(&query, &query.clone(), &weights());
    assert!(has_signal);
    assert_relative_eq!(score, 1.0, epsilon = 1e-12);
}

#[test]
fn missing_fields_renormalize() {
    let query = full_record();
    let entry = DescriptorRecord {
        tempo_bpm: Some(120.0),
        // no key/mode, no energy, no brightness
        ..Default::default()
    };
    let (score, has_signal) = descriptor_score(&query, &entry, &weights());
    // Only tempo is shared, identical, so the renormalized blend is 1.0.
    assert!(has_signal);
    assert_relative_eq!(score, 1.0, epsilon = 1e-12);
}

#[test]
fn descriptor_score_stays_in_unit_interval() {
    let cases = [
        DescriptorRecord::default(),
        full_record(),
        DescriptorRecord {
            tempo_bpm: Some(500.0),
            energy_rms: Some(9.0),
            brightness_hz: Some(19_000.0),
            key: Some(PitchClass::Fs),
            mode: Some(Mode::Minor),
            ..Default::default()
        },
    ];
    let query = full_record();
    for entry in &cases {
        let (score, _) = descriptor_score(&query, entry, &weights());
        assert!((0.0..=1.0).contains(&score), "score {score} out of range");
    }
}

#[test]
fn all_fields_missing_scores_zero() {
    let (score, has_signal) =
        descriptor_score(&DescriptorRecord::default(), &DescriptorRecord::default(), &weights());
    assert_eq!(score, 0.0);
    assert!(!has_signal);
}

#[test]
fn key_match_requires_both_key_and_mode() {
    let query = full_record();
    let mut entry = full_record();
    entry.mode = Some(Mode::Minor);
    let (score, _) = descriptor_score(&query, &entry, &weights());
    // Key/mode component contributes 0 of its 0.3 weight.
    assert_relative_eq!(score, 0.7, epsilon = 1e-12);
}

#[test]
fn identical_records_rank_at_similarity_one_without_embeddings() {
    let query = full_record();
    let mut catalog = Catalog::new();
    catalog.insert("track_0001", full_record());

    let matches = rank(&query, &catalog, 5, &weights());
    assert_eq!(matches.len(), 1);
    assert_relative_eq!(matches[0].similarity, 1.0, epsilon = 1e-12);
    assert_eq!(matches[0].components.blend, BlendMode::DescriptorOnly);
    assert_relative_eq!(matches[0].components.descriptor_score, 1.0, epsilon = 1e-12);
}

#[test]
fn embedding_blend_uses_seventy_thirty() {
    let mut query = full_record();
    query.embedding = Some(vec![1.0, 0.0]);
    let mut entry = full_record();
    entry.embedding = Some(vec![0.0, 1.0]); // orthogonal: cosine 0

    let mut catalog = Catalog::new();
    catalog.insert("t", entry);

    let matches = rank(&query, &catalog, 1, &weights());
    let m = &matches[0];
    assert_eq!(m.components.blend, BlendMode::EmbeddingAndDescriptor);
    assert_relative_eq!(m.components.embedding_score.unwrap(), 0.0, epsilon = 1e-9);
    // 0.70 * 0.0 + 0.30 * 1.0
    assert_relative_eq!(m.similarity, 0.30, epsilon = 1e-9);
}

#[test]
fn zero_length_embedding_falls_back_to_descriptors() {
    let mut query = full_record();
    query.embedding = Some(vec![]);
    let mut entry = full_record();
    entry.embedding = Some(vec![]);

    let components = score_pair(&query, &entry, &weights());
    assert_eq!(components.blend, BlendMode::DescriptorOnly);
    assert!(components.embedding_score.is_none());
}

#[test]
fn incomparable_entry_stays_ranked_at_zero() {
    let query = full_record();
    let mut catalog = Catalog::new();
    catalog.insert("comparable", full_record());
    catalog.insert("blank", DescriptorRecord::default());

    let matches = rank(&query, &catalog, 10, &weights());
    assert_eq!(matches.len(), 2);
    let blank = matches.iter().find(|m| m.track_id == "blank").unwrap();
    assert_eq!(blank.similarity, 0.0);
    assert_eq!(blank.components.blend, BlendMode::NoComparableSignal);
}

#[test]
fn empty_catalog_returns_empty_list() {
    let matches = rank(&full_record(), &Catalog::new(), 10, &weights());
    assert!(matches.is_empty());
}

#[test]
fn k_larger_than_catalog_returns_everything_sorted() {
    let query = full_record();
    let mut catalog = Catalog::new();
    for (id, tempo) in [("a", 120.0), ("b", 60.0), ("c", 100.0)] {
        let record = DescriptorRecord {
            tempo_bpm: Some(tempo),
            ..Default::default()
        };
        catalog.insert(id, record);
    }

    let matches = rank(&query, &catalog, 100, &weights());
    assert_eq!(matches.len(), 3);
    for pair in matches.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    assert_eq!(matches[0].track_id, "a");
}

#[test]
fn ties_break_by_ascending_track_id() {
    let query = full_record();
    let mut catalog = Catalog::new();
    catalog.insert("zeta", full_record());
    catalog.insert("alpha", full_record());
    catalog.insert("mid", full_record());

    let matches = rank(&query, &catalog, 10, &weights());
    let ids: Vec<&str> = matches.iter().map(|m| m.track_id.as_str()).collect();
    assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn top_k_truncates() {
    let query = full_record();
    let mut catalog = Catalog::new();
    for i in 0..20 {
        catalog.insert(format!("track_{i:02}"), full_record());
    }
    assert_eq!(rank(&query, &catalog, 5, &weights()).len(), 5);
}

#[test]
fn snapshot_survives_swap() {
    let mut first = Catalog::new();
    first.insert("only", full_record());
    let handle = CatalogHandle::new(first);

    let snapshot = handle.snapshot();
    assert_eq!(snapshot.len(), 1);

    handle.swap(Catalog::new());
    // Old snapshot is still intact; new snapshots see the replacement.
    assert_eq!(snapshot.len(), 1);
    assert!(handle.snapshot().is_empty());
}

#[test]
fn scenario_identical_descriptor_no_embeddings() {
    // query {tempo=120, key=C, mode=Major, energy=0.5, brightness=1800}
    // vs identical catalog entry: descriptorScore = similarity = 1.0.
    let query = full_record();
    let mut catalog = Catalog::new();
    catalog.insert("twin", full_record());

    let m = &rank(&query, &catalog, 1, &weights())[0];
    assert_relative_eq!(m.components.descriptor_score, 1.0, epsilon = 1e-12);
    assert_relative_eq!(m.similarity, 1.0, epsilon = 1e-12);
}
