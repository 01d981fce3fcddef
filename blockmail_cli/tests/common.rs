use assert_cmd::Command;
use insta_cmd::get_cargo_bin;

pub fn blockmail_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("blockmail"));
	cmd.env("NO_COLOR", "1").env_remove("BLOCKMAIL_LOG");
	cmd
}
