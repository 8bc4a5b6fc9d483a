/// True when `marker` occurs anywhere in `path`.
pub fn in_scope(path: &str, marker: &str) -> bool {
    path.contains(marker)
}
