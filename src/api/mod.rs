// =============================================================================
// API Module: REST surface over the watchlist and the evaluation pipeline
// =============================================================================

pub mod rest;
