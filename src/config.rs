use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(name = "scribe", about = "A minimal flat-file blog backend")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory holding posts.json
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Directory served as static files
    #[arg(long)]
    pub public_dir: Option<PathBuf>,

    /// Run without upload support
    #[arg(long)]
    pub disable_uploads: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub site: SiteConfig,
    pub uploads: UploadsConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub posts_file: Option<PathBuf>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SiteConfig {
    pub public_dir: PathBuf,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct UploadsConfig {
    pub enabled: bool,
    pub dir: Option<PathBuf>,
    pub max_body_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
        }
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: None,
            max_body_mb: 50,
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // CLI overrides
        if let Some(ref host) = cli.host {
            config.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.server.port = port;
        }
        if let Some(ref public_dir) = cli.public_dir {
            config.site.public_dir = public_dir.clone();
        }
        if cli.disable_uploads {
            config.uploads.enabled = false;
        }

        // Resolve paths
        if config.storage.posts_file.is_none() {
            config.storage.posts_file = Some(data_dir.join("posts.json"));
        }
        if config.uploads.dir.is_none() {
            config.uploads.dir = Some(config.site.public_dir.join("uploads"));
        }

        Ok(config)
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| PathBuf::from("data"))
    }

    pub fn posts_path(&self) -> PathBuf {
        self.storage
            .posts_file
            .clone()
            .unwrap_or_else(|| PathBuf::from("data").join("posts.json"))
    }

    pub fn uploads_path(&self) -> PathBuf {
        self.uploads
            .dir
            .clone()
            .unwrap_or_else(|| self.site.public_dir.join("uploads"))
    }

    pub fn public_path(&self) -> &PathBuf {
        &self.site.public_dir
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.uploads.max_body_mb.saturating_mul(1024 * 1024)
    }
}
