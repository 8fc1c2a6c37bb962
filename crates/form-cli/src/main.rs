mod input;
mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use form_spec::{
    CategorySpec, FormState, ValidationResult, ValueMap, answers_schema, build_render_payload,
    example_values, render_json_ui, render_text, resolve_visibility, validate_category,
};
use input::{load_category, load_values};
use store::{CategoryCommand, FieldCommand, StoreArgs, run_category, run_field};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Category application form helper",
    long_about = "Validates and renders category application forms and manages their field definitions in a JSON store"
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG takes precedence when set).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a value map against a category's visible fields.
    Validate {
        /// Field definitions: a category document or an array of fields.
        #[arg(long, value_name = "FIELDS")]
        fields: PathBuf,
        /// JSON object of values keyed by field id.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        /// Print the validation result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Render the form controls for the current values.
    Render {
        #[arg(long, value_name = "FIELDS")]
        fields: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Run a validation pass first so errors appear beneath their controls.
        #[arg(long)]
        check: bool,
        #[arg(long, value_enum, default_value_t = RenderFormat::Text)]
        format: RenderFormat,
    },
    /// Print the JSON Schema of the value map for the visible fields.
    Schema {
        #[arg(long, value_name = "FIELDS")]
        fields: PathBuf,
        /// Values that decide which conditional fields are visible.
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
    },
    /// Print a sample value map that passes validation.
    Example {
        #[arg(long, value_name = "FIELDS")]
        fields: PathBuf,
    },
    /// Print the JSON Schema of the field definition document.
    DefinitionSchema,
    /// Manage categories in the store.
    Category {
        #[command(flatten)]
        store: StoreArgs,
        #[command(subcommand)]
        command: CategoryCommand,
    },
    /// Manage a category's fields in the store.
    Field {
        #[command(flatten)]
        store: StoreArgs,
        #[command(subcommand)]
        command: FieldCommand,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Validate {
            fields,
            values,
            json,
        } => run_validate(fields, values, json),
        Command::Render {
            fields,
            values,
            check,
            format,
        } => run_render(fields, values, check, format),
        Command::Schema { fields, values } => run_schema(fields, values),
        Command::Example { fields } => run_example(fields),
        Command::DefinitionSchema => {
            let schema = schemars::schema_for!(CategorySpec);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(())
        }
        Command::Category { store, command } => run_category(store, command),
        Command::Field { store, command } => run_field(store, command),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A second init (tests driving main twice) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn run_validate(fields_path: PathBuf, values_path: PathBuf, json: bool) -> CliResult<()> {
    let category = load_category(&fields_path)?;
    let values = load_values(Some(&values_path))?;

    let result = validate_category(&category, &values);
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Validation result: {}",
            if result.valid { "valid" } else { "invalid" }
        );
        describe_validation(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} - {} ({})", error.field_id, error.message, error.code);
        }
    }
    if !result.missing_required.is_empty() {
        println!(
            "Missing required fields: {}",
            result.missing_required.join(", ")
        );
    }
}

fn run_render(
    fields_path: PathBuf,
    values_path: Option<PathBuf>,
    check: bool,
    format: RenderFormat,
) -> CliResult<()> {
    let category = load_category(&fields_path)?;
    let values = load_values(values_path.as_deref())?;

    let mut state = FormState::for_category(&category).with_values(values);
    if check {
        state.validate();
    }
    let payload = build_render_payload(&category, &state);
    match format {
        RenderFormat::Text => println!("{}", render_text(&payload)),
        RenderFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&render_json_ui(&payload))?)
        }
    }
    Ok(())
}

fn run_schema(fields_path: PathBuf, values_path: Option<PathBuf>) -> CliResult<()> {
    let category = load_category(&fields_path)?;
    let values = load_values(values_path.as_deref())?;
    let visibility = resolve_visibility(&category.fields, &values);
    let schema = answers_schema(&category.fields, &visibility);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

fn run_example(fields_path: PathBuf) -> CliResult<()> {
    let category = load_category(&fields_path)?;
    let visibility = resolve_visibility(&category.fields, &ValueMap::new());
    let example = example_values(&category.fields, &visibility);
    println!("{}", serde_json::to_string_pretty(&example)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use serde_json::Value;

    const FIXTURE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../form-spec/tests/fixtures/internship.json"
    );

    fn cli() -> Command {
        let mut cmd = Command::cargo_bin("category-forms").expect("binary builds");
        cmd.env_remove(store::STORE_ENV).env_remove("RUST_LOG");
        cmd
    }

    fn stdout_of(cmd: &mut Command) -> String {
        let output = cmd.output().expect("command runs");
        assert!(
            output.status.success(),
            "command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).expect("utf8 stdout")
    }

    #[test]
    fn validate_reports_visible_failures_and_exits_non_zero() {
        let workspace = TempDir::new().expect("temp dir");
        let values = workspace.child("values.json");
        values
            .write_str(r#"{ "f-years": 55, "f-relocate": true, "f-stack": ["rust"] }"#)
            .expect("write values");

        let output = cli()
            .args(["validate", "--fields", FIXTURE, "--values"])
            .arg(values.path())
            .output()
            .expect("command runs");
        assert!(!output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Validation result: invalid"));
        assert!(stdout.contains("f-years - Must be at most 40 (max)"));
        assert!(stdout.contains("Missing required fields: f-name, f-city"));
        // The stack is hidden until the backend track is chosen.
        assert!(!stdout.contains("f-stack"));
    }

    #[test]
    fn validate_accepts_a_complete_application() {
        let workspace = TempDir::new().expect("temp dir");
        let values = workspace.child("values.json");
        values
            .write_str(
                r#"{ "f-name": "Ada", "f-track": "backend", "f-stack": ["rust", "kafka"], "f-relocate": false }"#,
            )
            .expect("write values");

        let stdout = stdout_of(
            cli()
                .args(["validate", "--json", "--fields", FIXTURE, "--values"])
                .arg(values.path()),
        );
        let result: Value = serde_json::from_str(&stdout).expect("json result");
        assert_eq!(result["valid"], Value::Bool(true));
    }

    #[test]
    fn render_lists_controls_in_order() {
        let stdout = stdout_of(cli().args(["render", "--fields", FIXTURE]));
        assert!(stdout.contains("Category: Internship (internship)"));
        let name = stdout.find("Full Name").expect("name control");
        let resume = stdout.find("Resume Link").expect("resume control");
        assert!(name < resume);
        assert!(!stdout.contains("Preferred City"));
        assert!(!stdout.contains("Legacy widget"));
    }

    #[test]
    fn render_json_shows_errors_after_check() {
        let workspace = TempDir::new().expect("temp dir");
        let values = workspace.child("values.json");
        values.write_str(r#"{ "f-relocate": true }"#).expect("write values");

        let stdout = stdout_of(
            cli()
                .args(["render", "--check", "--format", "json", "--fields", FIXTURE, "--values"])
                .arg(values.path()),
        );
        let ui: Value = serde_json::from_str(&stdout).expect("json ui");
        assert_eq!(ui["status"], Value::String("invalid".into()));
    }

    #[test]
    fn example_values_pass_validation() {
        let workspace = TempDir::new().expect("temp dir");
        let stdout = stdout_of(cli().args(["example", "--fields", FIXTURE]));
        let example = workspace.child("example.json");
        example.write_str(&stdout).expect("write example");

        cli()
            .args(["validate", "--fields", FIXTURE, "--values"])
            .arg(example.path())
            .assert()
            .success();
    }

    #[test]
    fn schema_requires_visible_required_fields() {
        let stdout = stdout_of(cli().args(["schema", "--fields", FIXTURE]));
        let schema: Value = serde_json::from_str(&stdout).expect("schema json");
        assert_eq!(schema["required"], serde_json::json!(["f-name"]));
    }

    #[test]
    fn definition_schema_describes_categories() {
        let stdout = stdout_of(cli().arg("definition-schema"));
        let schema: Value = serde_json::from_str(&stdout).expect("schema json");
        assert!(schema["properties"]["fields"].is_object());
    }

    #[test]
    fn store_commands_build_and_reorder_a_form() {
        let workspace = TempDir::new().expect("temp dir");
        let store = workspace.child("forms.json");

        cli()
            .env(store::STORE_ENV, store.path())
            .args(["category", "add", "jobs", "--name", "Jobs"])
            .assert()
            .success();
        for label in ["Alpha", "Beta", "Gamma"] {
            cli()
                .env(store::STORE_ENV, store.path())
                .args(["field", "add", "jobs", "--label", label])
                .assert()
                .success();
        }

        let moved = stdout_of(
            cli()
                .env(store::STORE_ENV, store.path())
                .args(["field", "move", "jobs", "2", "0"]),
        );
        let gamma = moved.find("0. Gamma").expect("gamma first");
        let alpha = moved.find("1. Alpha").expect("alpha second");
        assert!(gamma < alpha);

        let listed = stdout_of(cli().args(["field", "list", "jobs", "--json", "--store"]).arg(store.path()));
        let fields: Value = serde_json::from_str(&listed).expect("fields json");
        let labels = fields
            .as_array()
            .expect("array")
            .iter()
            .map(|field| field["label"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        assert_eq!(labels, ["Gamma", "Alpha", "Beta"]);

        let exported = stdout_of(
            cli()
                .env(store::STORE_ENV, store.path())
                .args(["category", "export", "jobs"]),
        );
        let document = workspace.child("jobs.json");
        document.write_str(&exported).expect("write export");
        let rendered = stdout_of(cli().args(["render", "--fields"]).arg(document.path()));
        assert!(rendered.contains("Category: Jobs (jobs)"));
    }

    #[test]
    fn duplicate_field_names_are_refused() {
        let workspace = TempDir::new().expect("temp dir");
        let store = workspace.child("forms.json");
        cli()
            .args(["category", "add", "jobs", "--store"])
            .arg(store.path())
            .assert()
            .success();
        cli()
            .args(["field", "add", "jobs", "--label", "Email", "--type", "email", "--store"])
            .arg(store.path())
            .assert()
            .success();
        cli()
            .args(["field", "add", "jobs", "--label", "email", "--store"])
            .arg(store.path())
            .assert()
            .failure();
    }

    #[test]
    fn removing_a_category_cascades() {
        let workspace = TempDir::new().expect("temp dir");
        let store = workspace.child("forms.json");
        let run = |args: &[&str]| {
            let mut cmd = cli();
            cmd.args(args).arg("--store").arg(store.path());
            stdout_of(&mut cmd)
        };
        run(&["category", "add", "jobs"]);
        run(&["field", "add", "jobs", "--label", "Portfolio", "--type", "url"]);
        let removed = run(&["category", "remove", "jobs"]);
        assert!(removed.contains("Removed category 'jobs' and 1 field(s)"));
        assert!(run(&["category", "list"]).trim().is_empty());
    }
}
