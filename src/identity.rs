// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of gelf-tracing.
//
// gelf-tracing is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! Who is logging.
//!
//! Every GELF message names its originating host, and may name a facility, a deployment
//! environment & a service. None of these vary from one log call to the next, so they're gathered
//! up front into an [`Identity`] & handed to the codec. The codec itself never consults the
//! process environment.

use crate::error::{Error, Result};

use backtrace::Backtrace;

/// The ambient identity fields stamped onto every [`LogMessage`](crate::message::LogMessage).
#[derive(Clone, Debug, PartialEq)]
pub struct Identity {
    host: String,
    facility: String,
    environment: String,
    service: String,
}

impl Identity {
    pub fn builder() -> IdentityBuilder {
        IdentityBuilder {
            imp: Identity::default(),
        }
    }

    /// Attempt to discover the local hostname.
    ///
    /// Tries [gethostname()] first, then falls back to the IP address of the local interface.
    /// Fails only if neither is available.
    ///
    /// [gethostname()]: https://man7.org/linux/man-pages/man2/gethostname.2.html
    pub fn try_default() -> Result<Identity> {
        let host = hostname::get()
            .map_err(|err| Error::NoHostname {
                source: Box::new(err),
                back: Backtrace::new(),
            })
            // vvv :=> Result<String>; a non-UTF-8 hostname is as good as none
            .and_then(|hn| {
                hn.into_string()
                    .ok()
                    .filter(|hn| !hn.is_empty())
                    .ok_or_else(|| Error::NoHostname {
                        source: "hostname is not valid UTF-8".into(),
                        back: Backtrace::new(),
                    })
            })
            .or_else(|_err| {
                local_ip_address::local_ip()
                    .map(|ip| ip.to_string())
                    .map_err(|err| Error::NoHostname {
                        source: Box::new(err),
                        back: Backtrace::new(),
                    })
            })?;
        Ok(Identity {
            host,
            facility: String::new(),
            environment: String::new(),
            service: String::new(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }
    pub fn facility(&self) -> &str {
        &self.facility
    }
    pub fn environment(&self) -> &str {
        &self.environment
    }
    pub fn service(&self) -> &str {
        &self.service
    }
}

impl std::default::Default for Identity {
    /// Like [`Identity::try_default`], but cannot fail; if no hostname can be discovered, "-" is
    /// used.
    fn default() -> Self {
        Identity::try_default().unwrap_or_else(|_| Identity {
            host: "-".to_string(),
            facility: String::new(),
            environment: String::new(),
            service: String::new(),
        })
    }
}

pub struct IdentityBuilder {
    imp: Identity,
}

impl IdentityBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.imp.host = host.into();
        self
    }
    pub fn facility(mut self, facility: impl Into<String>) -> Self {
        self.imp.facility = facility.into();
        self
    }
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.imp.environment = environment.into();
        self
    }
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.imp.service = service.into();
        self
    }
    pub fn build(self) -> Identity {
        self.imp
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn identity() {
        // At least _exercise_ `Default`
        let x = Identity::default();
        assert!(!x.host().is_empty());
        assert!(x.facility().is_empty());

        let x = Identity::builder()
            .host("bree.local")
            .facility("billing")
            .environment("staging")
            .service("invoicer")
            .build();
        assert_eq!(x.host(), "bree.local");
        assert_eq!(x.facility(), "billing");
        assert_eq!(x.environment(), "staging");
        assert_eq!(x.service(), "invoicer");
    }
}
