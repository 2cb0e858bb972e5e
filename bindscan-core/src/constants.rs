// =============================================================================
// Alphabet
// =============================================================================

/// Number of valid nucleotide symbols (A, C, G, T)
pub const ALPHABET_SIZE: usize = 4;

/// Ordinal of the unknown/padding symbol `N`
pub const UNKNOWN_ORDINAL: u8 = 4;

/// Symbol used to pad sequences before slicing windows
pub const PAD_SYMBOL: u8 = b'N';

/// Probability assigned to the unknown symbol by static-weight models
pub const UNKNOWN_PROBABILITY: f64 = 0.25;

/// Length of a dinucleotide feature vector (4 x 4 pairs)
pub const DINUCLEOTIDE_FEATURES: usize = ALPHABET_SIZE * ALPHABET_SIZE;

// =============================================================================
// Batching and scanning
// =============================================================================

/// Maximum number of model inputs evaluated together
pub const DEFAULT_BATCH_SIZE: usize = 2048;

/// Number of records sliced into windows at a time in scan mode
pub const SCAN_CHUNK_SIZE: usize = 32;

/// Default window width for scan mode
pub const DEFAULT_SCAN_WINDOW: usize = 20;

// =============================================================================
// Model store
// =============================================================================

/// File extension of static-weight model files
pub const PFM_EXTENSION: &str = "pfm";

/// Serialized evaluable model inside a model subdirectory
pub const MODEL_JSON: &str = "model.json";

/// Legacy serialized model marker, recognized but not loadable
pub const MODEL_PICKLE: &str = "model.pkl";

/// Default sequence attribute name for FASTA input
pub const DEFAULT_SEQUENCE_ATTRIBUTE: &str = "seq";
