//! MTPuTTY session-database adapter
//!
//! Batch, not interactive: stages one saved session per resolved device
//! into the persisted `mtputty.xml` document. Before any mutation the
//! existing file is copied to a backup path; entries whose display name
//! collides with an incoming device are removed (replace-by-name), then one
//! `Node` element per device is appended and the whole document is written
//! back. Sessions must afterwards be launched manually from the MTPuTTY
//! GUI.

use std::collections::HashSet;
use std::io::BufReader;
use std::path::Path;

use xmltree::{Element, XMLNode};

use cls_core::ResolvedSession;

use crate::error::LaunchError;

/// Where MTPuTTY normally keeps its session database
pub const DEFAULT_CONFIG_PATH: &str = "%appdata%\\TTYPlus\\mtputty.xml";

/// Backup written to the working directory before any mutation
pub const BACKUP_FILE: &str = "mtputty_backup.xml";

/// SavedSession value used when no jump host is given
pub const DEFAULT_SAVED_SESSION: &str = "Default Settings";

/// Stage sessions into the MTPuTTY database at `config`
///
/// The backup copy to `backup` is a mandatory side effect preceding any
/// mutation; backup, parse, mutate, and write form one logical unit with no
/// partial-write recovery beyond that copy.
pub fn stage_sessions(
    config: &Path,
    backup: &Path,
    sessions: &[ResolvedSession],
    jumphost: Option<&str>,
) -> Result<(), LaunchError> {
    std::fs::copy(config, backup).map_err(|source| LaunchError::Backup {
        path: config.to_path_buf(),
        backup: backup.to_path_buf(),
        source,
    })?;
    tracing::info!(backup = %backup.display(), "MTPuTTY configuration backed up");

    let file = std::fs::File::open(config).map_err(|source| LaunchError::ConfigIo {
        path: config.to_path_buf(),
        source,
    })?;
    let mut root =
        Element::parse(BufReader::new(file)).map_err(|source| LaunchError::ConfigParse {
            path: config.to_path_buf(),
            source,
        })?;

    {
        let servers = root
            .get_mut_child("Servers")
            .and_then(|servers| servers.get_mut_child("Putty"))
            .ok_or_else(|| LaunchError::MissingServerSection {
                path: config.to_path_buf(),
            })?;

        let incoming: HashSet<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
        servers.children.retain(|node| {
            let XMLNode::Element(element) = node else {
                return true;
            };
            let display = element
                .get_child("DisplayName")
                .and_then(|child| child.get_text());
            match display {
                Some(name) if incoming.contains(name.as_ref()) => {
                    tracing::info!(session = %name, "removing existing session from MTPuTTY database");
                    false
                }
                _ => true,
            }
        });

        for session in sessions {
            tracing::info!(
                session = %session.name,
                address = %session.address,
                port = session.ssh_port(),
                username = %session.username,
                "creating session in MTPuTTY database"
            );
            servers
                .children
                .push(XMLNode::Element(session_node(session, jumphost)));
        }
    }

    let out = std::fs::File::create(config).map_err(|source| LaunchError::ConfigIo {
        path: config.to_path_buf(),
        source,
    })?;
    root.write(out).map_err(|source| LaunchError::ConfigWrite {
        path: config.to_path_buf(),
        source,
    })?;
    Ok(())
}

fn session_node(session: &ResolvedSession, jumphost: Option<&str>) -> Element {
    let mut node = Element::new("Node");
    node.attributes
        .insert("Type".to_string(), "1".to_string());
    push_text(
        &mut node,
        "SavedSession",
        jumphost.unwrap_or(DEFAULT_SAVED_SESSION),
    );
    push_text(&mut node, "DisplayName", &session.name);
    push_text(&mut node, "ServerName", &session.address);
    push_text(&mut node, "Port", &session.ssh_port().to_string());
    push_text(&mut node, "UserName", &session.username);
    if let Some(password) = &session.password {
        push_text(&mut node, "Password", password);
    }
    push_text(&mut node, "CLParams", &cl_params(session, jumphost));
    node
}

fn push_text(parent: &mut Element, name: &str, text: &str) {
    let mut child = Element::new(name);
    child.children.push(XMLNode::Text(text.to_string()));
    parent.children.push(XMLNode::Element(child));
}

/// The plain-text PuTTY launch-argument preview stored alongside each
/// session; the password is always masked here even though the raw value
/// sits in its own element
pub fn cl_params(session: &ResolvedSession, jumphost: Option<&str>) -> String {
    let load = jumphost
        .map(|jumphost| format!("-load {jumphost} "))
        .unwrap_or_default();
    let mask = if session.password.is_some() {
        " -pw *****"
    } else {
        ""
    };
    format!(
        "{load}-l {}{mask} {} -P {}",
        session.username,
        session.address,
        session.ssh_port()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    const EXISTING_CONFIG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MTPutty>
  <Servers>
    <Putty>
      <Node Type="1">
        <SavedSession>Default Settings</SavedSession>
        <DisplayName>r1</DisplayName>
        <ServerName>10.0.0.1</ServerName>
        <Port>22</Port>
        <UserName>old-user</UserName>
      </Node>
      <Node Type="1">
        <SavedSession>Default Settings</SavedSession>
        <DisplayName>unrelated</DisplayName>
        <ServerName>10.0.0.9</ServerName>
        <Port>22</Port>
        <UserName>keep-me</UserName>
      </Node>
    </Putty>
  </Servers>
</MTPutty>
"#;

    fn session(name: &str, password: Option<&str>) -> ResolvedSession {
        let mut ports = IndexMap::new();
        ports.insert("ssh".to_string(), 2022_u16);
        ResolvedSession {
            name: name.to_string(),
            address: "172.20.20.2".to_string(),
            username: "admin".to_string(),
            password: password.map(str::to_string),
            ports,
        }
    }

    fn display_names(config: &Path) -> Vec<String> {
        let root =
            Element::parse(std::fs::File::open(config).unwrap()).unwrap();
        let servers = root
            .get_child("Servers")
            .and_then(|s| s.get_child("Putty"))
            .unwrap();
        servers
            .children
            .iter()
            .filter_map(|node| node.as_element())
            .filter_map(|el| el.get_child("DisplayName"))
            .filter_map(|el| el.get_text())
            .map(|text| text.into_owned())
            .collect()
    }

    #[test]
    fn test_replace_by_name_leaves_exactly_one_entry() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("mtputty.xml");
        let backup = dir.path().join("mtputty_backup.xml");
        std::fs::write(&config, EXISTING_CONFIG).unwrap();

        stage_sessions(&config, &backup, &[session("r1", Some("secret"))], None).unwrap();

        let names = display_names(&config);
        assert_eq!(names.iter().filter(|n| n.as_str() == "r1").count(), 1);
        // unrelated entries survive
        assert!(names.iter().any(|n| n == "unrelated"));

        // the surviving r1 is the new one
        let root = Element::parse(std::fs::File::open(&config).unwrap()).unwrap();
        let servers = root
            .get_child("Servers")
            .and_then(|s| s.get_child("Putty"))
            .unwrap();
        let r1 = servers
            .children
            .iter()
            .filter_map(|node| node.as_element())
            .find(|el| {
                el.get_child("DisplayName")
                    .and_then(|d| d.get_text())
                    .is_some_and(|t| t == "r1")
            })
            .unwrap();
        assert_eq!(
            r1.get_child("UserName").unwrap().get_text().unwrap(),
            "admin"
        );
        assert_eq!(r1.get_child("Port").unwrap().get_text().unwrap(), "2022");
    }

    #[test]
    fn test_backup_written_before_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("mtputty.xml");
        let backup = dir.path().join("backup.xml");
        std::fs::write(&config, EXISTING_CONFIG).unwrap();

        stage_sessions(&config, &backup, &[session("r9", None)], None).unwrap();

        let saved = std::fs::read_to_string(&backup).unwrap();
        assert_eq!(saved, EXISTING_CONFIG);
    }

    #[test]
    fn test_preview_masks_password_but_element_carries_raw_value() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("mtputty.xml");
        let backup = dir.path().join("backup.xml");
        std::fs::write(&config, EXISTING_CONFIG).unwrap();

        stage_sessions(
            &config,
            &backup,
            &[session("r1", Some("secret"))],
            Some("clab-host"),
        )
        .unwrap();

        let root = Element::parse(std::fs::File::open(&config).unwrap()).unwrap();
        let servers = root
            .get_child("Servers")
            .and_then(|s| s.get_child("Putty"))
            .unwrap();
        let r1 = servers
            .children
            .iter()
            .filter_map(|node| node.as_element())
            .find(|el| {
                el.get_child("DisplayName")
                    .and_then(|d| d.get_text())
                    .is_some_and(|t| t == "r1")
            })
            .unwrap();

        let preview = r1.get_child("CLParams").unwrap().get_text().unwrap();
        assert_eq!(
            preview,
            "-load clab-host -l admin -pw ***** 172.20.20.2 -P 2022"
        );
        assert_eq!(
            r1.get_child("Password").unwrap().get_text().unwrap(),
            "secret"
        );
        assert_eq!(
            r1.get_child("SavedSession").unwrap().get_text().unwrap(),
            "clab-host"
        );
    }

    #[test]
    fn test_no_password_omits_password_element() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("mtputty.xml");
        let backup = dir.path().join("backup.xml");
        std::fs::write(&config, EXISTING_CONFIG).unwrap();

        stage_sessions(&config, &backup, &[session("r3", None)], None).unwrap();

        let root = Element::parse(std::fs::File::open(&config).unwrap()).unwrap();
        let servers = root
            .get_child("Servers")
            .and_then(|s| s.get_child("Putty"))
            .unwrap();
        let r3 = servers
            .children
            .iter()
            .filter_map(|node| node.as_element())
            .find(|el| {
                el.get_child("DisplayName")
                    .and_then(|d| d.get_text())
                    .is_some_and(|t| t == "r3")
            })
            .unwrap();
        assert!(r3.get_child("Password").is_none());
        let preview = r3.get_child("CLParams").unwrap().get_text().unwrap();
        assert!(!preview.contains("-pw"));
    }

    #[test]
    fn test_missing_servers_section() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("mtputty.xml");
        let backup = dir.path().join("backup.xml");
        std::fs::write(&config, "<MTPutty><Other/></MTPutty>").unwrap();

        let err = stage_sessions(&config, &backup, &[session("r1", None)], None).unwrap_err();
        assert!(matches!(err, LaunchError::MissingServerSection { .. }));
    }
}
