//! `capgate describe` command.

use crate::kernel::Kernel;

/// Execute the `describe` command, printing the kernel summary as JSON.
///
/// # Errors
///
/// Returns an error string if the summary cannot be serialized.
pub fn run(kernel: &Kernel) -> Result<(), String> {
    let summary = serde_json::to_string_pretty(&kernel.describe_subsystems())
        .map_err(|e| format!("Failed to render summary: {e}"))?;
    println!("{summary}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_bare_kernel() {
        assert!(run(&Kernel::new()).is_ok());
    }
}
