// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Status codes shared by the raspytube crates and the [`ErrorExt`] trait that
//! turns an error chain into a message fit for a popup.

use std::error::Error as StdError;

use serde::Serialize;
use strum::EnumProperty;

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Serialize,
    strum_macros::Display,
    strum_macros::EnumProperty,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StatusCode {
    #[strum(props(user_message = "Invalid request"))]
    InvalidArgument,
    #[strum(props(user_message = "Video not found"))]
    NotFound,
    #[strum(props(user_message = "Playback unavailable"))]
    Unavailable,
    #[strum(props(user_message = "Internal error"))]
    Internal,
    #[strum(props(user_message = "Internal error"))]
    Unknown,
}

impl StatusCode {
    /// Short, human readable prefix for messages shown to the user.
    pub fn user_message(self) -> &'static str {
        self.get_str("user_message").unwrap_or("Internal error")
    }

    /// Whether the error is worth showing in detail. Internal failures are
    /// reported by code only.
    pub const fn is_user_facing(self) -> bool {
        !matches!(self, Self::Internal | Self::Unknown)
    }
}

pub trait ErrorExt: StdError {
    fn status_code(&self) -> StatusCode { StatusCode::Unknown }

    /// Message for the UI: the status prefix, this error and the innermost
    /// source when there is one.
    fn output_msg(&self) -> String
    where
        Self: Sized,
    {
        let code = self.status_code();
        if !code.is_user_facing() {
            return format!("{}: {}", code.user_message(), code as u32);
        }
        match self.root_cause() {
            Some(root) => format!("{}: {self}: {root}", code.user_message()),
            None => format!("{}: {self}", code.user_message()),
        }
    }

    fn root_cause(&self) -> Option<&dyn StdError>
    where
        Self: Sized,
    {
        let mut source = self.source()?;
        while let Some(next) = source.source() {
            source = next;
        }
        Some(source)
    }
}
