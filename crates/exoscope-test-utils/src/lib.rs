//! exoscope-test-utils — Fixtures shared by the Exoscope test suites.
//!
//!   - `lightcurves`: synthetic transit light curves and CSV rendering
//!   - `multipart`: hand-built `multipart/form-data` request bodies
//!   - `catalog`: temporary catalog files with known contents

pub mod lightcurves;
pub mod multipart;
pub mod catalog;
