// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Contribution badges.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// The fixed set of badges a contributor can earn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/src/lib/generated/")
)]
pub enum BadgeName {
    #[serde(rename = "Newbie Committer")]
    NewbieCommitter,
    #[serde(rename = "Rising Contributor")]
    RisingContributor,
    #[serde(rename = "Issue Solver")]
    IssueSolver,
    #[serde(rename = "Merge Artisian")]
    MergeArtisian,
    #[serde(rename = "PR Ninja")]
    PrNinja,
    #[serde(rename = "Open Source Expert")]
    OpenSourceExpert,
    #[serde(rename = "Open Source Guru")]
    OpenSourceGuru,
    #[serde(rename = "Open Source Samurai")]
    OpenSourceSamurai,
}

impl BadgeName {
    pub const ALL: [BadgeName; 8] = [
        BadgeName::NewbieCommitter,
        BadgeName::RisingContributor,
        BadgeName::IssueSolver,
        BadgeName::MergeArtisian,
        BadgeName::PrNinja,
        BadgeName::OpenSourceExpert,
        BadgeName::OpenSourceGuru,
        BadgeName::OpenSourceSamurai,
    ];

    /// Stable key used in document IDs.
    pub fn slug(self) -> &'static str {
        match self {
            BadgeName::NewbieCommitter => "newbie_committer",
            BadgeName::RisingContributor => "rising_contributor",
            BadgeName::IssueSolver => "issue_solver",
            BadgeName::MergeArtisian => "merge_artisian",
            BadgeName::PrNinja => "pr_ninja",
            BadgeName::OpenSourceExpert => "open_source_expert",
            BadgeName::OpenSourceGuru => "open_source_guru",
            BadgeName::OpenSourceSamurai => "open_source_samurai",
        }
    }
}

/// A badge held by one user. Unique per (user, badge).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    pub user_id: String,
    pub badge: BadgeName,
    pub awarded_at: String,
}

impl Badge {
    /// Document ID enforcing the (user, badge) uniqueness.
    pub fn doc_id(user_id: &str, badge: BadgeName) -> String {
        format!("{}_{}", user_id, badge.slug())
    }
}
