mod common;

use blockmail_core::AnyEmptyResult;
use rstest::rstest;

#[test]
fn vars_lists_every_referenced_variable() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("t.txt"),
		"{{#if rsvp === 'yes'}}{{name}}{{else}}{{#unless plus_one}}{{ city }}{{/unless}}{{/if}}",
	)?;

	common::blockmail_cmd()
		.arg("vars")
		.arg(tmp.path().join("t.txt"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("city\nname\nplus_one\nrsvp\n");

	Ok(())
}

#[test]
fn vars_skips_malformed_blocks() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("t.txt"), "{{greeting}} {{#if vip}}{{name}}")?;

	common::blockmail_cmd()
		.arg("vars")
		.arg(tmp.path().join("t.txt"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("greeting\nname\n");

	Ok(())
}

#[test]
fn no_subcommand_prints_usage_hint() {
	common::blockmail_cmd()
		.assert()
		.code(1)
		.stderr(predicates::str::contains("blockmail --help"));
}

#[test]
fn vars_ignores_else_tags() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("t.txt"), "{{else}} {{name}} {{#if vip}}A{{else}}B")?;

	common::blockmail_cmd()
		.arg("vars")
		.arg(tmp.path().join("t.txt"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("name\n");

	Ok(())
}

#[rstest]
#[case::lenient(false, "a\ninner\nouter\n")]
#[case::strict(true, "inner\nouter\n")]
fn vars_respects_strict_flag(#[case] strict: bool, #[case] expected: &str) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("t.txt"), "{{#if a}}{{inner}}{{/unless}} {{outer}}")?;

	let mut cmd = common::blockmail_cmd();
	cmd.arg("vars")
		.arg(tmp.path().join("t.txt"))
		.arg("--path")
		.arg(tmp.path());
	if strict {
		cmd.arg("--strict");
	}

	cmd.assert()
		.success()
		.stdout(predicates::ord::eq(expected.to_string()));

	Ok(())
}

#[test]
fn vars_reads_strict_closers_from_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("t.txt"), "{{#unless a}}x{{/if}}")?;
	std::fs::write(
		tmp.path().join("blockmail.toml"),
		"[render]\nstrict_closers = true\n",
	)?;

	common::blockmail_cmd()
		.arg("vars")
		.arg(tmp.path().join("t.txt"))
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("");

	Ok(())
}
