use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar for one phase, drawn on stderr. Hidden when `enabled` is
/// false or the style template fails to parse.
pub fn phase_bar(len: u64, description: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    match ProgressStyle::with_template(
        "{msg:>22} [{elapsed_precise}] [{bar:10}] {pos}/{len} ({per_sec})",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("=> ")),
        Err(_) => return ProgressBar::hidden(),
    }
    pb.set_message(description.to_owned());
    pb
}
