//! # corpai
//!
//! Terminal client for the Corporate AI assistant.
//!
//! The backend does the reasoning, retrieval, SQL generation and policy
//! enforcement. This crate signs in, forwards questions, renders answers
//! and result tables, runs the knowledge-base training pipeline with a
//! live dashboard, and browses query audit logs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌───────────────────┐
//! │  CLI (corpai)│──▶│  ApiClient  │──▶│ Corporate AI API  │
//! │ chat / admin │   │ bearer auth │   │  (HTTP + NDJSON)  │
//! └──────┬───────┘   └──────┬──────┘   └───────────────────┘
//!        │                  │
//!        ▼                  ▼
//! ┌──────────────┐   ┌─────────────┐
//! │ corpai-core  │   │   Session   │
//! │ chat/pipeline│   │ token + watch│
//! └──────────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! corpai login ada@corp.example      # password from stdin or CORPAI_PASSWORD
//! corpai chat                        # interactive
//! corpai chat --category Sales "show me Q1 sales"
//! corpai admin train                 # run the training pipeline
//! corpai logs list
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Client error taxonomy |
//! | [`session`] | Token storage and sign-out notifications |
//! | [`routes`] | Route guard |
//! | [`api`] | Backend HTTP client |
//! | [`login`] | Login, logout, profile |
//! | [`chat`] | Chat controller and interactive loop |
//! | [`training`] | Training stream consumer and dashboard |
//! | [`progress`] | Training progress reporters |
//! | [`logs`] | Audit log views |
//! | [`upload`] | Knowledge-base upload |
//! | [`categories`] | Category listing |
//! | [`logging`] | Tracing setup |

pub mod api;
pub mod categories;
pub mod chat;
pub mod config;
pub mod error;
pub mod logging;
pub mod login;
pub mod logs;
pub mod progress;
pub mod routes;
pub mod session;
pub mod training;
pub mod upload;
