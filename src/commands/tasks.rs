use anyhow::Result;

use super::load_project;
use crate::cli::TasksArgs;

pub fn run(args: &TasksArgs) -> Result<()> {
    let project = load_project(&args.common)?;

    for name in project.task_names() {
        println!("{}", name);
    }

    Ok(())
}
