//! ログ初期化
//!
//! `tracing` + `tracing-subscriber`。出力はstderr（stdoutは進捗表示用）。
//! RUST_LOG 環境変数が設定されていればそちらを優先する。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// ログ初期化
///
/// * `verbose` - true なら DEBUG、false なら WARN 以上のみ
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // 二重初期化（テスト等）は無視
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}
