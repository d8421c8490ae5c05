//! 画像操作ロック
//!
//! 生成・編集・クロップ・アップロードはUI全体で同時に1つだけ。
//! 取得したガードを落とすと必ず解放されるので、成功・失敗・キャンセルの
//! どの経路でも解放漏れが起きない。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// UI全体で1つのビジーフラグ
#[derive(Debug, Clone, Default)]
pub struct GenerationLock {
    busy: Arc<AtomicBool>,
}

impl GenerationLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// ロック取得を試みる（取得済みなら None）
    pub fn try_acquire(&self) -> Option<LockGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| LockGuard {
                busy: Arc::clone(&self.busy),
            })
    }

    /// リセット時の強制解放
    pub fn force_release(&self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

/// ロック保持中の証明。Dropで解放される。
#[derive(Debug)]
pub struct LockGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_and_release() {
        let lock = GenerationLock::new();
        assert!(!lock.is_busy());

        let guard = lock.try_acquire().expect("取得できるはず");
        assert!(lock.is_busy());
        drop(guard);
        assert!(!lock.is_busy());
    }

    #[test]
    fn test_second_acquire_is_refused() {
        let lock = GenerationLock::new();
        let _guard = lock.try_acquire().expect("取得できるはず");
        assert!(lock.try_acquire().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let lock = GenerationLock::new();
        let other = lock.clone();
        let _guard = lock.try_acquire().unwrap();
        assert!(other.is_busy());
        assert!(other.try_acquire().is_none());
    }

    #[test]
    fn test_released_on_early_return() {
        fn failing_operation(lock: &GenerationLock) -> Result<(), &'static str> {
            let _guard = lock.try_acquire().ok_or("busy")?;
            Err("backend error")
        }

        let lock = GenerationLock::new();
        assert!(failing_operation(&lock).is_err());
        assert!(!lock.is_busy());
    }

    #[test]
    fn test_force_release() {
        let lock = GenerationLock::new();
        let guard = lock.try_acquire().unwrap();
        lock.force_release();
        assert!(!lock.is_busy());
        drop(guard);
        assert!(!lock.is_busy());
    }
}
