use vergen::EmitBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Exposes VERGEN_RUSTC_SEMVER to the crate
    EmitBuilder::builder().rustc_semver().emit()?;
    Ok(())
}
