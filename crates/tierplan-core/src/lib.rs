//! tierplan core: クラスター構成のデータモデルと KDL ローダー
//!
//! 環境（リージョン、ゾーン、共有リソース）とクラスター（ティア群）を
//! KDL で宣言し、テンプレート展開・パース・検証を経て [`Project`] を得ます。
//!
//! # 概要
//!
//! - **model**: ティア、クラスター、環境、ネットワークの型
//! - **parser**: KDL ノードからモデルへの変換
//! - **loader**: ファイル発見 → 変数収集 → Tera 展開 → パース → 検証

pub mod discovery;
pub mod error;
pub mod loader;
pub mod model;
pub mod parser;
pub mod template;

pub use discovery::*;
pub use error::*;
pub use loader::*;
pub use model::*;
pub use parser::*;
pub use template::*;
