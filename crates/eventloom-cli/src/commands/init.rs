//! Initialize a new Eventloom project

use anyhow::Result;
use std::fs;
use std::path::Path;

use eventloom_core::config::CONFIG_FILE;

/// Run the init command
pub async fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    let abs_path = project_dir.canonicalize()?;

    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    if project_dir.join(CONFIG_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {}",
            project_dir.display(),
            CONFIG_FILE
        );
    }

    tracing::info!("Creating new Eventloom project: {}", project_name);

    fs::create_dir_all(project_dir.join("transforms"))?;
    fs::create_dir_all(project_dir.join("data"))?;

    let config = format!(
        r#"# Eventloom Project Configuration
name: {project_name}
table: users

# Transform documents, merged in order
transforms:
  - transforms/users.yaml

# Source files imported by `eventloom import`
files:
  - data/users.csv

delimiter: ","

# Fail on rows missing a copied field instead of writing null
strict: false

# stdout | file | http
sink:
  type: file
  path: data/output.jsonl
"#
    );
    fs::write(project_dir.join(CONFIG_FILE), config)?;

    let transform = r#"# Output field -> rule
#
#   "<input field>[:<format>]"   copy a column, optionally converted
#                                (string, integer, float, boolean,
#                                 timestamp, timestamp:<pattern>)
#   "{ <expression> }"           compute a value from the row
fields:
  id: "ID:integer"
  name: "Name"
  email: "{ lower(Email) }"
  active: "Active:boolean"
  signed_up: "SignedUp:timestamp:%d/%m/%Y"
  label: "{ Name + ' <' + lower(Email) + '>' }"
"#;
    fs::write(project_dir.join("transforms/users.yaml"), transform)?;

    let sample_data = "ID,Name,Email,Active,SignedUp
1,Alice Johnson,Alice@Example.com,yes,03/01/2024
2,Bob Smith,BOB@example.com,no,17/02/2024
3,Carol Williams,carol@example.com,yes,29/02/2024
";
    fs::write(project_dir.join("data/users.csv"), sample_data)?;

    let gitignore = r#"# Output files
data/output*.jsonl

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  eventloom validate    # Check configuration");
    tracing::info!("  eventloom import      # Import data/users.csv");

    Ok(())
}
