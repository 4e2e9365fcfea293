use std::io::{self, Write};

use anyhow::{Result, anyhow};

use crate::conversation::validate_email;
use crate::core::AppConfig;
use crate::core::db::{async_db, initialize_db, save_refresh_token};
use crate::google::CALENDAR_SCOPE;
use crate::google::oauth::{authorization_url, exchange_code_for_token};

pub async fn run(email: &str, config: &AppConfig) -> Result<()> {
    if !validate_email(email) {
        return Err(anyhow!("Invalid email address: {}", email));
    }
    if config.google_client_id.is_empty() || config.google_client_secret.is_empty() {
        return Err(anyhow!(
            "Set SLOTBOT_GOOGLE_CLIENT_ID and SLOTBOT_GOOGLE_CLIENT_SECRET in your environment"
        ));
    }

    let auth_url = authorization_url(
        &config.google_client_id,
        &config.google_redirect_uri,
        CALENDAR_SCOPE,
    );
    println!(
        "\nPlease open the following URL in your browser and authorize access:\n\n{}\n",
        auth_url
    );
    print!("Paste the authorization code shown by Google here: ");
    io::stdout().flush()?;
    let mut code = String::new();
    io::stdin().read_line(&mut code)?;
    let code = code.trim();

    let token = exchange_code_for_token(
        &config.google_oauth_url,
        &config.google_client_id,
        &config.google_client_secret,
        code,
        &config.google_redirect_uri,
    )
    .await?;

    // Store the refresh token in the DB and use that to fetch an access token from now on.
    let refresh_token = token
        .refresh_token
        .ok_or(anyhow!("No refresh token in response"))?;
    let db = async_db(&config.db_path()).await?;
    db.call(|conn| {
        initialize_db(conn)?;
        Ok(())
    })
    .await?;
    save_refresh_token(&db, email, "google", &refresh_token).await?;
    println!("Refresh token for {} saved to DB.", email);

    Ok(())
}
