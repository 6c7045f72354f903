// Resume PDF generation
// Implements: layout loading, HTML rendering, headless Chromium printing.
// All browser access goes through `engine::PdfEngine`.

pub mod engine;
pub mod generator;
pub mod handlers;
