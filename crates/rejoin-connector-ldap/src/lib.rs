//! Active Directory adapter for rejoin
//!
//! Implements the [`DirectorySource`](rejoin_connector::DirectorySource)
//! trait over LDAP, fetching computer accounts with server-side paging and
//! mapping directory attributes (FILETIME logon stamps, generalized-time
//! change stamps, binary object GUIDs) into domain records.

mod connector;
mod mapping;

pub use connector::LdapDirectorySource;
