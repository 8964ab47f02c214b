//! courier-core
//!
//! Core building blocks for the Courier task agent.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Task, TaskStatus, TaskType, ExecutionOutcome）
//! - **executor**: 実行レイヤー（TaskExecutor port, ShellExecutor, ExecutorRegistry）
//! - **queue**: 配送キュー（TaskQueue port, InMemory / Redis 実装）
//! - **store**: 永続化（TaskStore port, InMemory / Redis 実装）
//! - **processor**: エージェントの処理ループ（TaskProcessor, ProcessorHandle）
//! - **config**: エージェント設定（AgentConfig）
//! - **error**: エラー型
//!
//! The pipeline: a producer pushes a serialized task onto an agent's queue,
//! the agent's processor pops it, runs it through the executor registered for
//! its type, and persists every lifecycle transition in the store so anyone
//! can query the outcome later.

pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod processor;
pub mod queue;
pub mod store;
