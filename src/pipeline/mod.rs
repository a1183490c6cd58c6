pub mod import;
pub mod recognition;
pub mod extraction;
pub mod classification;
pub mod linking;
pub mod ingestion; // Orchestrator: uploading → ocr → extracting → classifying → linking
