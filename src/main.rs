use color_eyre::eyre::{WrapErr, bail};
use mid_rest_client::{
    HashToSign, HashType, Language,
    config::Config,
    rest::dao::{AuthenticationRequest, CertificateRequest},
    telemetry,
};

const USAGE: &str =
    "usage: mid-client <authenticate|certificate> <phone number> <national identity number>";

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [command, phone_number, national_identity_number] = args.as_slice() else {
        bail!(USAGE);
    };

    // Load configuration
    let config = Config::load().wrap_err("failed to load configuration")?;
    tracing::info!(
        endpoint = %config.connector.endpoint_url,
        relying_party = ?config.connector.relying_party_name,
        "Loaded configuration"
    );

    let client = config.client()?;

    match command.as_str() {
        "certificate" => {
            let request = CertificateRequest::builder()
                .with_phone_number(phone_number)
                .with_national_identity_number(national_identity_number)
                .build()?;
            let certificate = client.get_certificate(&request).await?;
            println!("Certificate: {} bytes", certificate.len());
        }
        "authenticate" => {
            let hash = HashToSign::generate_random(HashType::SHA256);
            println!("Verification code: {}", hash.calculate_verification_code());

            let request = AuthenticationRequest::builder()
                .with_phone_number(phone_number)
                .with_national_identity_number(national_identity_number)
                .with_hash_to_sign(hash)
                .with_language(Language::ENG)
                .with_display_text("Log in to self-service?")
                .build()?;
            let authentication = client.authenticate(&request).await?;
            let identity = authentication.identity()?;
            println!(
                "Authenticated {} {} ({}, {})",
                identity.given_name, identity.surname, identity.identity_code, identity.country
            );
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
