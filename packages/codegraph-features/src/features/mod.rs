//! Feature extraction building blocks
//!
//! - canonical/  - raw path record -> vocabulary key
//! - vocabulary/ - append-only key <-> column index
//! - matrix/     - growable sparse count matrix (+ Matrix Market codec)
//! - labels/     - per-row sample labels
//! - export/     - atomic artifact publishing

pub mod canonical;
pub mod export;
pub mod labels;
pub mod matrix;
pub mod vocabulary;
