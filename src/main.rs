use burn_mnist_mlp::{
    backend::{MainAutoBackend, MainBackend},
    cli::AppArgs,
};

fn main() -> anyhow::Result<()> {
    let app_args = AppArgs::parse()?;
    burn_mnist_mlp::launch::<MainBackend, MainAutoBackend>(&app_args)?;
    Ok(())
}
