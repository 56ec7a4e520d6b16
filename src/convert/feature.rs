//! Feature records and their side tables
//!
//! A conversion emits one flat array of [`Feature`]s. Anything a feature
//! needs beyond its coordinates lives in a side table ([`SequenceInfo`],
//! [`HomologyInfo`], [`FeatureInfo`]) and is reached through a typed handle
//! carried in the feature's [`Payload`].

use crate::core::error::{ConversionError, ConversionResult};
use crate::core::mapper::{GapBlock, Strand};
use crate::core::store::ObjKey;
use std::marker::PhantomData;

/// Kind of an emitted feature
///
/// Declaration order is the primary sort order: CDS before its exons,
/// exons before introns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureKind {
    Master,
    Sequence,
    FeatureObj,
    Cds,
    Exon,
    Intron,
    Homol,
    HomolGap,
    Feature,
    Splice5,
    Splice3,
    Visible,
    AssemblyTag,
    Allele,
    CloneEnd,
    Oligo,
    EmblFeature,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Master => "MASTER",
            FeatureKind::Sequence => "SEQUENCE",
            FeatureKind::FeatureObj => "FEATURE_OBJ",
            FeatureKind::Cds => "CDS",
            FeatureKind::Exon => "EXON",
            FeatureKind::Intron => "INTRON",
            FeatureKind::Homol => "HOMOL",
            FeatureKind::HomolGap => "HOMOL_GAP",
            FeatureKind::Feature => "FEATURE",
            FeatureKind::Splice5 => "SPLICE5",
            FeatureKind::Splice3 => "SPLICE3",
            FeatureKind::Visible => "VISIBLE",
            FeatureKind::AssemblyTag => "ASSEMBLY_TAG",
            FeatureKind::Allele => "ALLELE",
            FeatureKind::CloneEnd => "CLONE_END",
            FeatureKind::Oligo => "OLIGO",
            FeatureKind::EmblFeature => "EMBL_FEATURE",
        }
    }
}

/// Feature type: a kind plus the strand parity bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureType {
    pub kind: FeatureKind,
    pub strand: Strand,
}

impl FeatureType {
    pub fn new(kind: FeatureKind, strand: Strand) -> Self {
        Self { kind, strand }
    }

    pub fn forward(kind: FeatureKind) -> Self {
        Self::new(kind, Strand::Plus)
    }

    /// Same kind on the other strand
    pub fn flipped(self) -> Self {
        Self::new(self.kind, self.strand.complement())
    }
}

impl std::fmt::Display for FeatureType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.strand {
            Strand::Plus => write!(f, "{}", self.kind.as_str()),
            Strand::Minus => write!(f, "{}_UP", self.kind.as_str()),
        }
    }
}

/// Per-feature flag bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct FeatureFlags(u8);

impl FeatureFlags {
    /// True extent continues below the low reference end of the window
    pub const CLIPPED_TOP: FeatureFlags = FeatureFlags(1);
    /// True extent continues beyond the high reference end of the window
    pub const CLIPPED_BOTTOM: FeatureFlags = FeatureFlags(1 << 1);
    /// Drawn in reverse orientation on request of the match
    pub const FLIPPED: FeatureFlags = FeatureFlags(1 << 2);
    pub const DASHED: FeatureFlags = FeatureFlags(1 << 3);
    /// Joins members of two parents (paired reads)
    pub const TWO_PARENT_CLUSTER: FeatureFlags = FeatureFlags(1 << 4);
    pub(crate) const DELETED: FeatureFlags = FeatureFlags(1 << 7);

    pub const fn empty() -> Self {
        FeatureFlags(0)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: FeatureFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: FeatureFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: FeatureFlags) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: FeatureFlags, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }

    /// Exchange the top and bottom clip bits
    pub fn swap_clips(&mut self) {
        let top = self.contains(Self::CLIPPED_TOP);
        let bottom = self.contains(Self::CLIPPED_BOTTOM);
        self.set(Self::CLIPPED_TOP, bottom);
        self.set(Self::CLIPPED_BOTTOM, top);
    }
}

impl std::ops::BitOr for FeatureFlags {
    type Output = FeatureFlags;

    fn bitor(self, rhs: FeatureFlags) -> FeatureFlags {
        FeatureFlags(self.0 | rhs.0)
    }
}

/// Typed index into a side table
pub trait Handle: Copy {
    const TABLE: &'static str;

    fn from_index(index: usize) -> Self;

    fn index(self) -> usize;
}

macro_rules! define_handle {
    ($name:ident, $table:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl Handle for $name {
            const TABLE: &'static str = $table;

            fn from_index(index: usize) -> Self {
                $name(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_handle!(SeqId, "sequence");
define_handle!(HomolId, "homology");
define_handle!(FeatInfoId, "feature-info");

/// Dense append-only side table
#[derive(Debug, Clone, PartialEq)]
pub struct Table<I: Handle, T> {
    items: Vec<T>,
    _handle: PhantomData<I>,
}

impl<I: Handle, T> Default for Table<I, T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            _handle: PhantomData,
        }
    }
}

impl<I: Handle, T> Table<I, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) -> I {
        self.items.push(item);
        I::from_index(self.items.len() - 1)
    }

    pub fn get(&self, id: I) -> ConversionResult<&T> {
        let len = self.items.len();
        self.items.get(id.index()).ok_or(ConversionError::InvalidHandle {
            table: I::TABLE,
            index: id.index(),
            len,
        })
    }

    pub fn get_mut(&mut self, id: I) -> ConversionResult<&mut T> {
        let len = self.items.len();
        self.items.get_mut(id.index()).ok_or(ConversionError::InvalidHandle {
            table: I::TABLE,
            index: id.index(),
            len,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (I, &T)> {
        self.items.iter().enumerate().map(|(i, item)| (I::from_index(i), item))
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }
}

/// Set of handles, one bit per table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleSet<I: Handle> {
    bits: Vec<u64>,
    _handle: PhantomData<I>,
}

impl<I: Handle> HandleSet<I> {
    pub fn new() -> Self {
        Self {
            bits: Vec::new(),
            _handle: PhantomData,
        }
    }

    pub fn insert(&mut self, id: I) {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        if self.bits.len() <= word {
            self.bits.resize(word + 1, 0);
        }
        self.bits[word] |= 1 << bit;
    }

    pub fn contains(&self, id: I) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        self.bits.get(word).map_or(false, |w| w & (1 << bit) != 0)
    }

    pub fn len(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|w| *w == 0)
    }
}

/// Feature payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    None,
    /// Reading-frame phase of an exon, 0..=2
    Phase(u8),
    Note {
        score: Option<f64>,
        text: Option<String>,
    },
    Sequence(SeqId),
    Homology(HomolId),
    FeatureObj(FeatInfoId),
}

/// One emitted annotation record
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub ty: FeatureType,
    /// Reference coordinates, `start <= end` for everything but MASTER
    pub start: i64,
    pub end: i64,
    /// Owning object: the annotated object, the match, or the tagged object
    pub key: ObjKey,
    /// Anchor this feature derives from
    pub parent: Option<ObjKey>,
    /// Object whose rows produced this feature
    pub source: ObjKey,
    pub subfeature: Option<String>,
    pub flags: FeatureFlags,
    pub payload: Payload,
}

impl Feature {
    pub fn new(ty: FeatureType, start: i64, end: i64, key: ObjKey, source: ObjKey) -> Self {
        Self {
            ty,
            start,
            end,
            key,
            parent: None,
            source,
            subfeature: None,
            flags: FeatureFlags::empty(),
            payload: Payload::None,
        }
    }

    pub fn kind(&self) -> FeatureKind {
        self.ty.kind
    }

    pub fn strand(&self) -> Strand {
        self.ty.strand
    }

    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn is_deleted(&self) -> bool {
        self.flags.contains(FeatureFlags::DELETED)
    }

    pub fn with_parent(mut self, parent: ObjKey) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_subfeature(mut self, subfeature: impl Into<String>) -> Self {
        self.subfeature = Some(subfeature.into());
        self
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_flags(mut self, flags: FeatureFlags) -> Self {
        self.flags.insert(flags);
        self
    }

    /// Handle of the attached SequenceInfo
    pub fn sequence_id(&self) -> Option<SeqId> {
        match self.payload {
            Payload::Sequence(id) => Some(id),
            _ => None,
        }
    }

    /// Handle of the attached HomologyInfo
    pub fn homology_id(&self) -> Option<HomolId> {
        match self.payload {
            Payload::Homology(id) => Some(id),
            _ => None,
        }
    }
}

/// Kinds of biological support for an intron
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EvidenceKind {
    Est,
    Cdna,
    Homology,
    Utr,
    False,
    Inconsistent,
}

impl EvidenceKind {
    pub const ALL: [EvidenceKind; 6] = [
        EvidenceKind::Est,
        EvidenceKind::Cdna,
        EvidenceKind::Homology,
        EvidenceKind::Utr,
        EvidenceKind::False,
        EvidenceKind::Inconsistent,
    ];

    /// Parse a `Confirmed_intron` sub-tag
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "EST" => Some(EvidenceKind::Est),
            "cDNA" => Some(EvidenceKind::Cdna),
            "Homology" => Some(EvidenceKind::Homology),
            "UTR" => Some(EvidenceKind::Utr),
            "False" => Some(EvidenceKind::False),
            "Inconsistent" => Some(EvidenceKind::Inconsistent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceKind::Est => "EST",
            EvidenceKind::Cdna => "cDNA",
            EvidenceKind::Homology => "Homology",
            EvidenceKind::Utr => "UTR",
            EvidenceKind::False => "False",
            EvidenceKind::Inconsistent => "Inconsistent",
        }
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

/// Set of evidence kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct EvidenceSet(u8);

impl EvidenceSet {
    pub fn insert(&mut self, kind: EvidenceKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(&self, kind: EvidenceKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn union(self, other: EvidenceSet) -> EvidenceSet {
        EvidenceSet(self.0 | other.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = EvidenceKind> + '_ {
        EvidenceKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

/// One piece of confirmation evidence
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Evidence {
    pub kind: EvidenceKind,
    pub supporting: Option<ObjKey>,
}

/// Coding sub-range of a sequence, reference coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdsInfo {
    pub start: i64,
    pub end: i64,
    pub cds_only: bool,
}

/// Boolean properties of a sequence record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequenceFlags {
    pub has_exons: bool,
    pub coding: bool,
    /// Produced by intron reconciliation
    pub merged: bool,
}

/// Side record of sequence, exon-bearing and intron features
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SequenceInfo {
    pub method: Option<String>,
    pub score: Option<f64>,
    pub gaps: Vec<GapBlock>,
    pub cds: Option<CdsInfo>,
    /// Leading bases before the first full codon, 0..=2
    pub start_not_found: u8,
    pub end_not_found: bool,
    pub evidence: Vec<Evidence>,
    pub confirmed: EvidenceSet,
    pub flags: SequenceFlags,
}

impl SequenceInfo {
    pub fn with_method(method: Option<String>) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Record evidence once per (kind, supporting sequence)
    pub fn add_evidence(&mut self, evidence: Evidence) {
        self.confirmed.insert(evidence.kind);
        if !self.evidence.contains(&evidence) {
            self.evidence.push(evidence);
        }
    }
}

/// Homology tag kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HomolKind {
    Dna,
    Pep,
    Motif,
    Oligo,
    Structure,
    Rnai,
    Est,
}

impl HomolKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "DNA_homol" => Some(HomolKind::Dna),
            "Pep_homol" => Some(HomolKind::Pep),
            "Motif_homol" => Some(HomolKind::Motif),
            "Oligo_homol" => Some(HomolKind::Oligo),
            "Structure_homol" => Some(HomolKind::Structure),
            "RNAi_homol" => Some(HomolKind::Rnai),
            "EST_homol" => Some(HomolKind::Est),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HomolKind::Dna => "DNA_homol",
            HomolKind::Pep => "Pep_homol",
            HomolKind::Motif => "Motif_homol",
            HomolKind::Oligo => "Oligo_homol",
            HomolKind::Structure => "Structure_homol",
            HomolKind::Rnai => "RNAi_homol",
            HomolKind::Est => "EST_homol",
        }
    }

    /// Class of the matched object
    pub fn match_class(&self) -> &'static str {
        match self {
            HomolKind::Dna | HomolKind::Est | HomolKind::Oligo => "Sequence",
            HomolKind::Pep => "Protein",
            HomolKind::Motif => "Motif",
            HomolKind::Structure => "Structure_data",
            HomolKind::Rnai => "RNAi",
        }
    }

    /// Local bases per matched unit
    pub fn ratio(&self) -> i64 {
        match self {
            HomolKind::Pep => 3,
            _ => 1,
        }
    }
}

/// One ungapped sub-block of a homology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignBlock {
    pub local: (i64, i64),
    pub matched: (i64, i64),
    /// Reference positions of `local.0` and `local.1`
    pub ref_start: i64,
    pub ref_end: i64,
}

/// Side record of a homology feature
#[derive(Debug, Clone, PartialEq)]
pub struct HomologyInfo {
    pub kind: HomolKind,
    pub method: String,
    pub score: Option<f64>,
    /// Groups the blocks of one alignment
    pub align_id: u32,
    /// Position of this block within its alignment
    pub block: u32,
    /// Range on the matched object
    pub matched: (i64, i64),
    pub strand: Strand,
    pub gaps: Vec<AlignBlock>,
    pub alignment: Option<String>,
    /// Paired-read cluster, set only for paired-read members
    pub cluster: Option<u32>,
}

/// Side record of a lightweight feature object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureInfo {
    pub method: String,
}
