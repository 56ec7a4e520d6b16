//! Property-based tests for intron reconciliation
//!
//! **Property 6: reconciliation is idempotent**
//! **Property 7: identical introns share one record holding all evidence**

use fast_smap::convert::introns::reconcile_introns;
use fast_smap::convert::{
    Evidence, EvidenceKind, Feature, FeatureKind, FeatureType, Payload, SeqId, SequenceInfo, Table, UnsortedFeatures,
};
use fast_smap::core::{ObjKey, Strand};
use proptest::prelude::*;

/// (coordinate choice, strand, parent-linked, evidence kind)
type IntronCase = (usize, bool, bool, usize);

const SPANS: [(i64, i64); 4] = [(100, 200), (100, 250), (300, 400), (1000, 1001)];

fn build(cases: &[IntronCase]) -> (UnsortedFeatures, Table<SeqId, SequenceInfo>) {
    let mut features = UnsortedFeatures::new();
    let mut sequences = Table::new();
    for (i, &(span, minus, parent, kind)) in cases.iter().enumerate() {
        let (start, end) = SPANS[span];
        let strand = if minus { Strand::Minus } else { Strand::Plus };
        let mut info = SequenceInfo::default();
        info.add_evidence(Evidence { kind: EvidenceKind::ALL[kind], supporting: None });
        let id = sequences.push(info);
        let key = ObjKey::new("Sequence", format!("t{}", i));
        let mut feature = Feature::new(FeatureType::new(FeatureKind::Intron, strand), start, end, key.clone(), key.clone())
            .with_payload(Payload::Sequence(id));
        feature.parent = parent.then_some(key);
        features.push(feature);
    }
    (features, sequences)
}

fn case_strategy() -> impl Strategy<Value = IntronCase> {
    (0..SPANS.len(), any::<bool>(), any::<bool>(), 0..EvidenceKind::ALL.len())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_reconcile_idempotent(cases in prop::collection::vec(case_strategy(), 1..20)) {
        let (features, mut sequences) = build(&cases);
        let empty = Table::new();
        let once = reconcile_introns(features.sort(&empty), &mut sequences).unwrap().sort(&empty);
        let records = sequences.len();
        let twice = reconcile_introns(once.clone(), &mut sequences).unwrap().sort(&empty);
        prop_assert_eq!(once, twice);
        prop_assert_eq!(sequences.len(), records);
    }

    #[test]
    fn prop_duplicates_share_union(cases in prop::collection::vec(case_strategy(), 1..20)) {
        let (features, mut sequences) = build(&cases);
        let empty = Table::new();
        let result = reconcile_introns(features.sort(&empty), &mut sequences).unwrap().sort(&empty);

        for strand in [Strand::Plus, Strand::Minus] {
            for (span_index, &(start, end)) in SPANS.iter().enumerate() {
                let inputs: Vec<&IntronCase> =
                    cases.iter().filter(|s| s.0 == span_index && s.1 == (strand == Strand::Minus)).collect();
                let survivors: Vec<&Feature> = result
                    .of_type(FeatureType::new(FeatureKind::Intron, strand))
                    .iter()
                    .filter(|f| (f.start, f.end) == (start, end))
                    .collect();
                if inputs.is_empty() {
                    prop_assert!(survivors.is_empty());
                    continue;
                }

                let any_parent = inputs.iter().any(|s| s.2);
                let expected = if any_parent { inputs.iter().filter(|s| s.2).count() } else { inputs.len() };
                prop_assert_eq!(survivors.len(), expected);

                let first = survivors[0].sequence_id().unwrap();
                prop_assert!(survivors.iter().all(|f| f.sequence_id() == Some(first)));
                let info = sequences.get(first).unwrap();
                for case in &inputs {
                    prop_assert!(info.confirmed.contains(EvidenceKind::ALL[case.3]));
                }
            }
        }
    }
}
