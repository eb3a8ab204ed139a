//! 会话 cookie 持久化
//!
//! cookie 以一行 `name=value; name2=value2` 的形式保存在文件中。
//! 读写失败只记录日志，不影响登录流程。

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取保存的 cookie 头；文件不存在或为空时返回 None
    pub fn load(&self) -> Option<String> {
        match fs::read_to_string(&self.path) {
            Ok(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    None
                } else {
                    debug!("[Session] 读取会话 cookie: {}", self.path.display());
                    Some(text)
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("[Session] 读取会话文件失败 {}: {}", self.path.display(), e);
                None
            }
        }
    }

    pub fn save(&self, cookie_header: &str) {
        if let Some(parent) = self.path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("[Session] 创建目录失败 {}: {}", parent.display(), e);
                return;
            }
        }
        match fs::write(&self.path, cookie_header) {
            Ok(()) => debug!("[Session] 会话 cookie 已保存: {}", self.path.display()),
            Err(e) => warn!("[Session] 保存会话文件失败 {}: {}", self.path.display(), e),
        }
    }

    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("[Session] 会话文件已删除"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("[Session] 删除会话文件失败 {}: {}", self.path.display(), e),
        }
    }
}

/// 拆分 cookie 头为 `name=value` 片段
pub fn cookie_pairs(header: &str) -> impl Iterator<Item = &str> {
    header
        .split(';')
        .map(str::trim)
        .filter(|pair| pair.contains('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session"));
        assert_eq!(store.load(), None);

        store.save("auth=authcookie_123; twoFactorAuth=abc");
        assert_eq!(
            store.load().as_deref(),
            Some("auth=authcookie_123; twoFactorAuth=abc")
        );

        store.clear();
        assert_eq!(store.load(), None);
        // 重复删除不报错
        store.clear();
    }

    #[test]
    fn blank_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session");
        fs::write(&path, "  \n").unwrap();
        assert_eq!(SessionStore::new(path).load(), None);
    }

    #[test]
    fn splits_cookie_header() {
        let pairs: Vec<_> = cookie_pairs("auth=a; twoFactorAuth=b;;junk").collect();
        assert_eq!(pairs, vec!["auth=a", "twoFactorAuth=b"]);
    }
}
