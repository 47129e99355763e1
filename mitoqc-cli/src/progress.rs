use indicatif::{ProgressBar, ProgressStyle};

/// A bar over `len` input files, hidden when stderr is not a terminal.
pub fn file_progress(len: usize, msg: &str) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
    {
        bar.set_style(style.progress_chars("##-"));
    }
    bar.set_message(msg.to_string());
    bar
}
