use ripper_core::{ConvertService, TokioProcessRunner};

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub service: ConvertService<TokioProcessRunner>,
}
