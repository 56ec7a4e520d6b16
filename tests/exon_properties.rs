//! Property-based tests for exon, intron and phase reconstruction
//!
//! **Property 3: every emitted feature is ordered, start <= end**
//! **Property 4: abutting exons never imply an intron**
//! **Property 5: coding phases tile the spliced coding range**

use fast_smap::convert::coding::{coding_phases, skip_bases, trailing_bases};
use fast_smap::convert::exons::ExonLayout;
use fast_smap::convert::{convert, ConversionOptions, FeatureKind, FeatureType};
use fast_smap::core::{parse_ace_bytes, AssemblyIndex, MethodTable, ObjKey, Strand};
use proptest::prelude::*;

/// Exon blocks from (length, gap-before-next) pairs, starting at 1
fn layout_from(parts: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let mut blocks = Vec::with_capacity(parts.len());
    let mut next = 1;
    for &(len, gap) in parts {
        blocks.push((next, next + len - 1));
        next += len + gap;
    }
    blocks
}

fn transcript_ace(blocks: &[(i64, i64)], offset: i64, reversed: bool) -> String {
    let span = blocks.last().map_or(1, |b| b.1);
    let (s, e) = if reversed { (offset + span - 1, offset) } else { (offset, offset + span - 1) };
    let mut text = format!(
        "Sequence : \"clone\"\nLength 20000\nSubsequence \"tx\" {} {}\n\nTranscript : \"tx\"\nMethod \"curated\"\nCDS\n",
        s, e
    );
    for (x1, x2) in blocks {
        text.push_str(&format!("Source_Exons {} {}\n", x1, x2));
    }
    text
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Phase and trailing bases agree with the running codon count
    #[test]
    fn prop_trailing_tracks_running_total(phase in 0u8..3, len in 1i64..1000) {
        let next = trailing_bases(len, phase);
        prop_assert!(next < 3);
        prop_assert_eq!(i64::from(next), (i64::from(phase) + len) % 3);
        prop_assert!(skip_bases(phase) < 3);
    }

    /// Each coding exon's phase is the coding bases before it, less the
    /// leading incomplete codon, modulo three
    #[test]
    fn prop_phases_tile(
        parts in prop::collection::vec((1i64..300, 2i64..200), 1..8),
        start_skip in 0u8..3,
    ) {
        let blocks = layout_from(&parts);
        let layout = ExonLayout { blocks: blocks.clone() };
        let cds = (blocks[0].0, blocks[blocks.len() - 1].1);
        let phases = coding_phases(&layout, cds, start_skip);

        let mut before = 0i64;
        for (&(s, e), phase) in blocks.iter().zip(&phases) {
            let phase = phase.expect("every exon codes");
            prop_assert_eq!(i64::from(phase), (before - i64::from(start_skip)).rem_euclid(3));
            before += e - s + 1;
        }
    }

    /// Introns appear only between exons separated by more than one base
    #[test]
    fn prop_intron_count(
        parts in prop::collection::vec((1i64..200, 1i64..100), 1..8),
        offset in 1i64..5000,
        reversed in any::<bool>(),
    ) {
        let blocks = layout_from(&parts);
        let store = parse_ace_bytes(transcript_ace(&blocks, offset, reversed).as_bytes()).unwrap();
        let root = ObjKey::new("Sequence", "clone");
        let index = AssemblyIndex::new(&store, &root, None).unwrap();
        let map = convert(&store, &index, &MethodTable::new(), &root, &ConversionOptions::default()).unwrap();

        let strand = if reversed { Strand::Minus } else { Strand::Plus };
        let expected_introns = blocks.windows(2).filter(|w| w[1].0 - w[0].1 > 1).count();
        prop_assert_eq!(map.features.of_type(FeatureType::new(FeatureKind::Intron, strand)).len(), expected_introns);
        prop_assert_eq!(map.features.of_type(FeatureType::new(FeatureKind::Exon, strand)).len(), blocks.len());

        for feature in map.features.iter() {
            prop_assert!(feature.start <= feature.end, "{} {}..{}", feature.ty, feature.start, feature.end);
        }
        let exons = map.features.of_type(FeatureType::new(FeatureKind::Exon, strand));
        let exon_bases: i64 = exons.iter().map(|f| f.end - f.start + 1).sum();
        let local_bases: i64 = blocks.iter().map(|(s, e)| e - s + 1).sum();
        prop_assert_eq!(exon_bases, local_bases);
    }
}
