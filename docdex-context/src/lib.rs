//! # docdex-context
//!
//! Pure text processing for the docdex retrieval engine: splitting raw
//! document text into overlapping, embedding-sized chunks, and assembling
//! ranked retrieval results back into a bounded context block for prompt
//! insertion.
//!
//! Both halves are deterministic and free of I/O, so they can be tested
//! without a store or an embedding backend.
//!
//! - [`TextChunker`]: paragraph-preferring overlapping segmentation
//! - [`ContextAssembler`]: budget-limited context block construction

pub mod assembler;
pub mod chunker;

pub use assembler::{ContextAssembler, ContextPassage, PASSAGE_DELIMITER};
pub use chunker::TextChunker;
