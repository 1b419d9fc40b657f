use std::path::{Component, Path, PathBuf};

use hlsgrab_engine::{OutputContainer, suggested_file_name};

use crate::error::AppError;

/// Creates all directories in the given path, including parent directories if they don't exist.
#[inline]
pub async fn create_dirs(path: &Path) -> Result<(), AppError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(AppError::Io)?;
    Ok(())
}

/// Rejects anything that would not land directly inside the output directory.
fn ensure_plain_file_name(name: &str) -> Result<(), AppError> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single_normal || name.contains(['/', '\\']) {
        return Err(AppError::InvalidInput(format!(
            "Output name '{name}' must be a plain file name"
        )));
    }
    Ok(())
}

/// File name for the download: the user supplied name, or one derived from `url`.
///
/// Either way the result is a plain file name, never a path.
pub fn output_file_name(
    url: &str,
    name: Option<&str>,
    container: OutputContainer,
) -> Result<String, AppError> {
    let file_name = match name.map(str::trim) {
        Some(name) => {
            ensure_plain_file_name(name)?;
            format!("{name}.{}", container.extension())
        }
        None => suggested_file_name(url, container),
    };
    ensure_plain_file_name(&file_name)?;
    Ok(file_name)
}

/// Writes `data` to `dir/file_name`, creating `dir` first. Returns the written path.
pub async fn write_output(dir: &Path, file_name: &str, data: &[u8]) -> Result<PathBuf, AppError> {
    create_dirs(dir).await?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, data).await?;
    Ok(path)
}
