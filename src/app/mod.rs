// Application layer - Use case interactors

pub mod cut_interactor;

// Re-export interactors
pub use cut_interactor::{CutInteractor, CutRequest, PreparedCut, SourceInfo};
