// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Policy evaluation seam

use evidex_core::{Evidence, Result, ScopeNode};
use serde::{Deserialize, Serialize};

/// Decision of the policy evaluator for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Keep,
    Discard,
}

/// Decides whether a freshly captured record is processed further.
///
/// Rule matching lives behind this trait. The dispatcher calls it exactly
/// once per dispatched record.
pub trait PolicyEvaluator: Send + Sync {
    fn evaluate(&self, scope: &ScopeNode, record: &Evidence) -> Result<Verdict>;
}

impl<F> PolicyEvaluator for F
where
    F: Fn(&ScopeNode, &Evidence) -> Result<Verdict> + Send + Sync,
{
    fn evaluate(&self, scope: &ScopeNode, record: &Evidence) -> Result<Verdict> {
        self(scope, record)
    }
}
