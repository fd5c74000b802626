use logo_stream::SavedLogoClient;

use crate::cli::SavedCommand;

pub async fn run(command: SavedCommand) -> anyhow::Result<()> {
    let client = SavedLogoClient::from_env()?;
    match command {
        SavedCommand::List => {
            let logos = client.list().await?;
            if logos.is_empty() {
                println!("No saved logos");
            }
            for logo in logos {
                println!("{:>6}  {:<24} {}", logo.id, logo.name, logo.image_path);
            }
        }
        SavedCommand::Save { name, path } => {
            let saved = client.save(&name, &path).await?;
            println!("Saved `{}` as #{}", saved.name, saved.id);
        }
        SavedCommand::Remove { id } => {
            client.remove(id).await?;
            println!("Removed #{id}");
        }
    }
    Ok(())
}

pub async fn login(username: &str, password: &str) -> anyhow::Result<()> {
    let mut client = SavedLogoClient::from_env()?;
    let session = client.login(username, password).await?;
    println!("Logged in as {} ({})", session.user.name, session.user.username);
    println!("LOGO_SPARK_TOKEN={}", session.token);
    Ok(())
}

pub async fn register(username: &str, password: &str, name: &str) -> anyhow::Result<()> {
    let mut client = SavedLogoClient::from_env()?;
    let session = client.register(username, password, name).await?;
    println!("Registered {} ({})", session.user.name, session.user.username);
    println!("LOGO_SPARK_TOKEN={}", session.token);
    Ok(())
}
