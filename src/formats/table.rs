//! Tab-separated feature table
//!
//! One line per feature:
//!
//! ```text
//! #type  strand  start  end  object  parent  source  subfeature  flags  detail
//! EXON   +       1000   1099 Transcript:tx  Transcript:tx  Transcript:tx  .  .  phase=0
//! ```
//!
//! `detail` is a `;`-separated list of `key=value` pairs drawn from the
//! feature's payload and side-table record.

use crate::convert::{convert, ConversionOptions, Feature, FeatureFlags, FeatureKind, FeatureMap, Payload};
use crate::core::error::Result;
use crate::core::index::AssemblyIndex;
use crate::core::method::MethodTable;
use crate::core::store::{MemoryStore, ObjKey};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write};

pub const HEADER: &str = "#type\tstrand\tstart\tend\tobject\tparent\tsource\tsubfeature\tflags\tdetail";

/// Counts gathered while writing a table
#[derive(Debug, Default, Clone)]
pub struct TableStats {
    pub features: usize,
    pub diagnostics: usize,
    pub by_kind: BTreeMap<FeatureKind, usize>,
}

impl TableStats {
    pub fn merge(&mut self, other: &TableStats) {
        self.features += other.features;
        self.diagnostics += other.diagnostics;
        for (kind, count) in &other.by_kind {
            *self.by_kind.entry(*kind).or_default() += count;
        }
    }
}

fn format_flags(flags: FeatureFlags) -> String {
    let names = [
        (FeatureFlags::CLIPPED_TOP, "clipped_top"),
        (FeatureFlags::CLIPPED_BOTTOM, "clipped_bottom"),
        (FeatureFlags::FLIPPED, "flipped"),
        (FeatureFlags::DASHED, "dashed"),
        (FeatureFlags::TWO_PARENT_CLUSTER, "two_parent"),
    ];
    let set: Vec<&str> = names
        .iter()
        .filter(|(flag, _)| flags.contains(*flag))
        .map(|(_, name)| *name)
        .collect();
    if set.is_empty() {
        ".".to_string()
    } else {
        set.join(",")
    }
}

fn format_detail(feature: &Feature, map: &FeatureMap) -> String {
    let mut detail = String::new();
    match &feature.payload {
        Payload::None => {}
        Payload::Phase(phase) => {
            let _ = write!(detail, "phase={}", phase);
        }
        Payload::Note { score, text } => {
            if let Some(score) = score {
                let _ = write!(detail, "score={};", score);
            }
            if let Some(text) = text {
                let _ = write!(detail, "note={};", text.replace(['\t', ';'], " "));
            }
        }
        Payload::Sequence(id) => {
            if let Ok(info) = map.sequences.get(*id) {
                if let Some(method) = &info.method {
                    let _ = write!(detail, "method={};", method);
                }
                if let Some(score) = info.score {
                    let _ = write!(detail, "score={};", score);
                }
                if !info.confirmed.is_empty() {
                    let kinds: Vec<&str> = info.confirmed.iter().map(|k| k.as_str()).collect();
                    let _ = write!(detail, "evidence={};", kinds.join(","));
                }
                if let Some(cds) = info.cds {
                    let _ = write!(detail, "cds={}..{};", cds.start, cds.end);
                }
                if info.start_not_found > 0 {
                    let _ = write!(detail, "start_not_found={};", info.start_not_found + 1);
                }
                if info.end_not_found {
                    detail.push_str("end_not_found;");
                }
            }
        }
        Payload::Homology(id) => {
            if let Ok(info) = map.homologies.get(*id) {
                let _ = write!(
                    detail,
                    "method={};match={}..{};align={}.{};",
                    info.method, info.matched.0, info.matched.1, info.align_id, info.block
                );
                if let Some(score) = info.score {
                    let _ = write!(detail, "score={};", score);
                }
                if !info.gaps.is_empty() {
                    let _ = write!(detail, "gaps={};", info.gaps.len());
                }
                if let Some(cluster) = info.cluster {
                    let _ = write!(detail, "pair={};", cluster);
                }
                if feature.kind() == FeatureKind::Homol {
                    if map.buried.contains(*id) {
                        detail.push_str("buried;");
                    }
                    if map.table_sourced.contains(*id) {
                        detail.push_str("table;");
                    }
                }
            }
        }
        Payload::FeatureObj(id) => {
            if let Ok(info) = map.feature_infos.get(*id) {
                let _ = write!(detail, "method={};", info.method);
            }
        }
    }
    let detail = detail.trim_end_matches(';');
    if detail.is_empty() {
        ".".to_string()
    } else {
        detail.to_string()
    }
}

/// Format one feature as a table line, without the newline
pub fn format_feature_line(feature: &Feature, map: &FeatureMap) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        feature.kind().as_str(),
        feature.strand(),
        feature.start,
        feature.end,
        feature.key,
        feature.parent.as_ref().map_or_else(|| ".".to_string(), |p| p.to_string()),
        feature.source,
        feature.subfeature.as_deref().unwrap_or("."),
        format_flags(feature.flags),
        format_detail(feature, map),
    )
}

/// Write every feature of a conversion, then its diagnostics as comments
pub fn write_feature_map<W: Write>(map: &FeatureMap, out: &mut W) -> io::Result<TableStats> {
    let mut stats = TableStats::default();
    for feature in map.features.iter() {
        writeln!(out, "{}", format_feature_line(feature, map))?;
        stats.features += 1;
        *stats.by_kind.entry(feature.kind()).or_default() += 1;
    }
    for diagnostic in &map.diagnostics {
        writeln!(out, "# warning: {}", diagnostic)?;
    }
    stats.diagnostics = map.diagnostics.len();
    Ok(stats)
}

/// One root to convert, with an optional area in root coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct RootRequest {
    pub key: ObjKey,
    pub area: Option<(i64, i64)>,
}

impl RootRequest {
    pub fn new(key: ObjKey) -> Self {
        Self { key, area: None }
    }
}

fn convert_root(
    store: &MemoryStore,
    methods: &MethodTable,
    request: &RootRequest,
    options: &ConversionOptions,
) -> Result<FeatureMap> {
    let index = AssemblyIndex::new(store, &request.key, request.area)?;
    Ok(convert(store, &index, methods, &request.key, options)?)
}

/// Convert every root and write the tables in request order
///
/// Roots are independent, so they are converted in parallel on a pool of
/// `threads` workers and written once all have finished.
pub fn convert_to_table<W: Write>(
    store: &MemoryStore,
    methods: &MethodTable,
    roots: &[RootRequest],
    options: &ConversionOptions,
    out: &mut W,
    threads: usize,
) -> Result<TableStats> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Failed to create thread pool: {}", e)))?;

    let maps: Vec<Result<FeatureMap>> = pool.install(|| {
        roots
            .par_iter()
            .map(|request| convert_root(store, methods, request, options))
            .collect()
    });

    let mut stats = TableStats::default();
    writeln!(out, "{}", HEADER)?;
    for (request, map) in roots.iter().zip(maps) {
        let map = map?;
        writeln!(out, "# root {}", request.key)?;
        stats.merge(&write_feature_map(&map, out)?);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{convert, ConversionOptions};
    use crate::core::ace::parse_ace_bytes;
    use crate::core::index::AssemblyIndex;
    use crate::core::method::MethodTable;
    use crate::core::store::ObjKey;

    const SAMPLE: &[u8] = b"\
Sequence : \"clone\"
Length 1000
Subsequence \"tx\" 101 400

Transcript : \"tx\"
Method \"curated\"
Source_Exons 1 50
Source_Exons 101 300
";

    fn sample() -> FeatureMap {
        let store = parse_ace_bytes(SAMPLE).unwrap();
        let root = ObjKey::new("Sequence", "clone");
        let index = AssemblyIndex::new(&store, &root, None).unwrap();
        convert(&store, &index, &MethodTable::new(), &root, &ConversionOptions::default()).unwrap()
    }

    #[test]
    fn test_format_flags() {
        assert_eq!(format_flags(FeatureFlags::empty()), ".");
        assert_eq!(
            format_flags(FeatureFlags::DASHED | FeatureFlags::CLIPPED_TOP),
            "clipped_top,dashed"
        );
    }

    #[test]
    fn test_write_table() {
        let map = sample();
        let mut out = Vec::new();
        let stats = write_feature_map(&map, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), stats.features);
        assert!(lines[0].starts_with("MASTER\t+\t1\t1000\tSequence:clone"));
        assert_eq!(stats.by_kind.get(&FeatureKind::Exon), Some(&2));
        assert!(lines.contains(&"EXON\t+\t101\t150\tTranscript:tx\tTranscript:tx\tTranscript:tx\t.\t.\tphase=0"));
        assert!(lines.iter().any(|l| l.starts_with("INTRON\t+\t151\t200\t")));
        assert!(lines
            .iter()
            .any(|l| l.starts_with("SEQUENCE\t+\t101\t400\t") && l.ends_with("method=curated")));
    }

    #[test]
    fn test_convert_to_table_keeps_request_order() {
        let store = parse_ace_bytes(SAMPLE).unwrap();
        let roots = vec![
            RootRequest { key: ObjKey::new("Transcript", "tx"), area: Some((1, 300)) },
            RootRequest::new(ObjKey::new("Sequence", "clone")),
        ];
        let mut out = Vec::new();
        let stats = convert_to_table(
            &store,
            &MethodTable::new(),
            &roots,
            &ConversionOptions::default(),
            &mut out,
            2,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        let tx = text.find("# root Transcript:tx").unwrap();
        let clone = text.find("# root Sequence:clone").unwrap();
        assert!(text.starts_with(HEADER));
        assert!(tx < clone);
        assert_eq!(stats.by_kind.get(&FeatureKind::Master), Some(&2));
    }

    #[test]
    fn test_convert_to_table_unknown_root() {
        let store = parse_ace_bytes(SAMPLE).unwrap();
        let roots = vec![RootRequest::new(ObjKey::new("Sequence", "missing"))];
        let mut out = Vec::new();
        let result = convert_to_table(
            &store,
            &MethodTable::new(),
            &roots,
            &ConversionOptions::default(),
            &mut out,
            1,
        );
        assert!(result.is_err());
    }
}
