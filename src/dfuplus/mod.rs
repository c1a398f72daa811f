pub mod glob;
pub mod parsers;
pub mod spray_format;

use std::fmt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::config::ConnectionConfig;
use crate::error::{Error, Result};

pub const ACTION_STATUS: &'static str = "action=status";
pub const ACTION_ABORT: &'static str = "action=abort";
pub const ACTION_LIST: &'static str = "action=list";
pub const ACTION_SPRAY: &'static str = "action=spray";
pub const ACTION_DESPRAY: &'static str = "action=despray";
pub const ACTION_REMOVE: &'static str = "action=remove";
pub const NOWAIT: &'static str = "nowait=1";

const PASSWORD_PREFIX: &'static str = "password=";

#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    executable: PathBuf,
    args: Vec<String>,
}

impl Command {
    pub fn new<P: Into<PathBuf>>(executable: P) -> Command {
        Command {
            executable: executable.into(),
            args: Vec::new(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Command {
        self.args.push(arg.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn action(&self) -> Option<&str> {
        self.args.iter()
            .find(|a| a.starts_with("action="))
            .map(|a| &a["action=".len()..])
    }

    pub fn value_of(&self, key: &str) -> Option<&str> {
        let prefix = format!("{}=", key);
        self.args.iter()
            .find(|a| a.starts_with(prefix.as_str()))
            .map(|a| &a[prefix.len()..])
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable.display())?;
        for arg in &self.args {
            if arg.starts_with(PASSWORD_PREFIX) {
                write!(f, " {}****", PASSWORD_PREFIX)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

fn flag(value: bool) -> u8 {
    match value {
        true => 1,
        false => 0,
    }
}

fn not_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

pub fn add_connection_arguments(mut cmd: Command, conn: &ConnectionConfig) -> Command {
    cmd = cmd.arg(format!("server={}", conn.server));
    if let Some(username) = not_blank(&conn.username) {
        cmd = cmd.arg(format!("username={}", username));
    }
    if let Some(password) = not_blank(&conn.password) {
        cmd = cmd.arg(format!("{}{}", PASSWORD_PREFIX, password));
    }
    if let Some(ip) = &conn.source_ip {
        cmd = cmd.arg(format!("srcip={}", ip));
    }
    if let Some(replicate) = conn.replicate {
        cmd = cmd.arg(format!("replicate={}", flag(replicate)));
    }
    if let Some(no_recover) = conn.no_recover {
        cmd = cmd.arg(format!("norecover={}", flag(no_recover)));
    }
    if let Some(throttle) = conn.throttle {
        cmd = cmd.arg(format!("throttle={}", throttle));
    }
    if let Some(size) = conn.transfer_buffer_size {
        cmd = cmd.arg(format!("transferbuffersize={}", size));
    }
    cmd
}

pub fn base_command(conn: &ConnectionConfig) -> Result<Command> {
    let exe = Path::new(&conn.dfuplus_command);
    let executable = exe.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false);
    if !executable {
        return Err(Error::Config(format!("Can't execute [{}]", exe.display())));
    }
    let exe = exe.canonicalize()?;

    Ok(add_connection_arguments(Command::new(exe), conn))
}

fn query(base: &Command, wuid: Option<&str>) -> Command {
    let wuid = wuid.filter(|w| !w.trim().is_empty());
    match wuid {
        Some(w) => base.clone().arg(format!("wuid={}", w)),
        None => base.clone(),
    }
}

pub fn status_command(base: &Command, wuid: &str) -> Command {
    query(base, Some(wuid)).arg(ACTION_STATUS)
}

pub fn abort_command(base: &Command, wuid: &str) -> Command {
    query(base, Some(wuid)).arg(ACTION_ABORT)
}

pub fn list_command(base: &Command, mask: &str) -> Command {
    base.clone()
        .arg(ACTION_LIST)
        .arg(format!("name={}", mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection() -> ConnectionConfig {
        ConnectionConfig {
            dfuplus_command: String::from("/bin/dfuplus"),
            server: String::from("2.3.4.5"),
            username: None,
            password: None,
            source_ip: None,
            transfer_buffer_size: None,
            throttle: None,
            replicate: None,
            no_recover: None,
        }
    }

    #[test]
    fn source_ip_follows_server() {
        let mut conn = connection();
        conn.source_ip = Some(String::from("1.2.3.4"));

        let cmd = add_connection_arguments(Command::new("/bin/dfuplus"), &conn);
        assert_eq!(cmd.args()[0], "server=2.3.4.5");
        assert_eq!(cmd.args()[1], "srcip=1.2.3.4");
    }

    #[test]
    fn blank_credentials_are_skipped() {
        let mut conn = connection();
        conn.username = Some(String::from(" "));
        conn.password = Some(String::new());

        let cmd = add_connection_arguments(Command::new("/bin/dfuplus"), &conn);
        assert_eq!(cmd.args(), &[String::from("server=2.3.4.5")]);
    }

    #[test]
    fn all_connection_arguments_in_order() {
        let mut conn = connection();
        conn.username = Some(String::from("hpccdemo"));
        conn.password = Some(String::from("secret"));
        conn.source_ip = Some(String::from("1.2.3.4"));
        conn.replicate = Some(true);
        conn.no_recover = Some(false);
        conn.throttle = Some(100);
        conn.transfer_buffer_size = Some(65536);

        let cmd = add_connection_arguments(Command::new("/bin/dfuplus"), &conn);
        let expected = vec![
            "server=2.3.4.5", "username=hpccdemo", "password=secret", "srcip=1.2.3.4",
            "replicate=1", "norecover=0", "throttle=100", "transferbuffersize=65536",
        ];
        assert_eq!(cmd.args(), expected.iter().map(|s| s.to_string()).collect::<Vec<_>>().as_slice());
    }

    #[test]
    fn display_hides_password() {
        let mut conn = connection();
        conn.password = Some(String::from("secret"));

        let cmd = add_connection_arguments(Command::new("/bin/dfuplus"), &conn).arg(ACTION_LIST);
        let text = cmd.to_string();
        assert_eq!(text, "/bin/dfuplus server=2.3.4.5 password=**** action=list");
        assert!(!text.contains("secret"));
    }

    #[test]
    fn status_and_abort_carry_wuid_before_action() {
        let base = add_connection_arguments(Command::new("/bin/dfuplus"), &connection());

        let status = status_command(&base, "D20160607-142043");
        assert_eq!(status.args()[1], "wuid=D20160607-142043");
        assert_eq!(status.action(), Some("status"));

        let abort = abort_command(&base, "D1");
        assert_eq!(abort.value_of("wuid"), Some("D1"));
        assert_eq!(abort.action(), Some("abort"));
        assert_eq!(base.args().len(), 1);
    }

    #[test]
    fn list_adds_name_mask() {
        let base = Command::new("/bin/dfuplus");
        let list = list_command(&base, "zzlc*");
        assert_eq!(list.action(), Some("list"));
        assert_eq!(list.value_of("name"), Some("zzlc*"));
    }

    #[test]
    fn base_command_requires_executable() {
        let conn = ConnectionConfig {
            dfuplus_command: String::from("/definitely/not/here/dfuplus"),
            ..connection()
        };
        assert!(matches!(base_command(&conn), Err(Error::Config(_))));
    }

    #[test]
    fn base_command_requires_execute_permission() {
        let exe = tempfile::NamedTempFile::new().unwrap();
        let conn = ConnectionConfig {
            dfuplus_command: exe.path().display().to_string(),
            ..connection()
        };

        std::fs::set_permissions(exe.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        assert!(matches!(base_command(&conn), Err(Error::Config(_))));

        std::fs::set_permissions(exe.path(), std::fs::Permissions::from_mode(0o755)).unwrap();
        let cmd = base_command(&conn).unwrap();
        assert_eq!(cmd.executable(), exe.path().canonicalize().unwrap().as_path());
        assert_eq!(cmd.args()[0], "server=2.3.4.5");
    }
}
