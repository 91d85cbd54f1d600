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

//! Canonical evidence type families used for aggregate counting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of evidence categories.
///
/// Raw evidence types that do not name one of these families (e.g. `ip`)
/// are not counted anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFamily {
    Addressbook,
    Application,
    Calendar,
    Call,
    Camera,
    Chat,
    Clipboard,
    Command,
    Device,
    File,
    Filesystem,
    Keylog,
    Message,
    Mic,
    Money,
    Mouse,
    Password,
    Photo,
    Position,
    Print,
    Screenshot,
    Url,
}

impl TypeFamily {
    pub const ALL: [TypeFamily; 22] = [
        TypeFamily::Addressbook,
        TypeFamily::Application,
        TypeFamily::Calendar,
        TypeFamily::Call,
        TypeFamily::Camera,
        TypeFamily::Chat,
        TypeFamily::Clipboard,
        TypeFamily::Command,
        TypeFamily::Device,
        TypeFamily::File,
        TypeFamily::Filesystem,
        TypeFamily::Keylog,
        TypeFamily::Message,
        TypeFamily::Mic,
        TypeFamily::Money,
        TypeFamily::Mouse,
        TypeFamily::Password,
        TypeFamily::Photo,
        TypeFamily::Position,
        TypeFamily::Print,
        TypeFamily::Screenshot,
        TypeFamily::Url,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TypeFamily::Addressbook => "addressbook",
            TypeFamily::Application => "application",
            TypeFamily::Calendar => "calendar",
            TypeFamily::Call => "call",
            TypeFamily::Camera => "camera",
            TypeFamily::Chat => "chat",
            TypeFamily::Clipboard => "clipboard",
            TypeFamily::Command => "command",
            TypeFamily::Device => "device",
            TypeFamily::File => "file",
            TypeFamily::Filesystem => "filesystem",
            TypeFamily::Keylog => "keylog",
            TypeFamily::Message => "message",
            TypeFamily::Mic => "mic",
            TypeFamily::Money => "money",
            TypeFamily::Mouse => "mouse",
            TypeFamily::Password => "password",
            TypeFamily::Photo => "photo",
            TypeFamily::Position => "position",
            TypeFamily::Print => "print",
            TypeFamily::Screenshot => "screenshot",
            TypeFamily::Url => "url",
        }
    }

    /// Map a raw evidence type onto its family, case-insensitively
    pub fn from_raw(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|family| family.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for TypeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
