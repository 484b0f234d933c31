use std::path::Path;

use indicatif::ProgressStyle;

/// 默认进度条样式
pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} {msg}",
    )
    .expect("failed to build progress style")
    .progress_chars("=>-")
}

/// 计算相对 `root` 的 POSIX 风格路径
pub fn posix_rel_path(path: &Path, root: &Path) -> anyhow::Result<String> {
    let rel = path.strip_prefix(root)?;
    let parts = rel.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>();
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_rel_path() {
        let root = Path::new("/data/images");
        let path = Path::new("/data/images/cats/tabby.jpg");
        assert_eq!(posix_rel_path(path, root).unwrap(), "cats/tabby.jpg");

        let path = Path::new("/data/images/top.jpg");
        assert_eq!(posix_rel_path(path, root).unwrap(), "top.jpg");
    }

    #[test]
    fn test_posix_rel_path_outside_root() {
        let root = Path::new("/data/images");
        let path = Path::new("/data/other/cat.jpg");
        assert!(posix_rel_path(path, root).is_err());
    }
}
