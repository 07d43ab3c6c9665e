//! Load-modify-save cycles against one server's `dhcpd.conf`.
//!
//! Every mutation reads the live configuration, edits the parsed lists and writes the result
//! back:
//!
//! 1. the new text is written next to the live file as `<conf_path>.candidate`,
//! 2. `dhcpd -t -4 -cf <candidate>` must accept it, or [`Error::InvalidGeneratedConfig`] is
//!    returned with the live file untouched,
//! 3. the live file is copied to `<backup dir>/dhcpd.conf.<UTC timestamp>.bak`,
//! 4. the candidate is moved over the live file with `mv -f`,
//! 5. the DHCP service is restarted, failing with [`Error::RestartFailed`].
//!
//! If any of steps 1 to 4 fails the candidate is removed and the live file is left as it was.
//! Saves run on their own task, so a request that is dropped half way (a timeout or a client
//! hanging up) can't stop a save between the backup and the restart.
//!
//! A [`DhcpService`] serializes its own cycles, so two requests against the same server never
//! interleave their read and write.

use crate::config::{Config, DhcpdConfig};
use crate::dhcpd::conf::{self, ConfDocument};
use crate::dhcpd::leases;
use crate::dhcpd::model::{Lease, Reservation, ReservationSpec, Subnet, SubnetSpec};
use crate::error::Error;
use crate::remote::{shell_quote, DynRemote, SshRemote};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

const BACKUP_STAMP: &[FormatItem<'static>] =
    format_description!("[year][month][day]T[hour][minute][second]Z");

/// One [`DhcpService`] per DHCP-enabled server, keyed by server id.
pub type Services = Arc<HashMap<String, Arc<DhcpService>>>;

/// Build an SSH-backed [`DhcpService`] for every server with the DHCP service enabled.
#[must_use]
pub fn from_config(config: &Config) -> Services {
    let services = config
        .servers
        .iter()
        .filter(|(_, server)| server.services.dhcp)
        .map(|(id, server)| {
            let remote: DynRemote = Arc::new(SshRemote::new(server));
            let service = DhcpService::new(id.clone(), config.dhcpd.clone(), remote);
            (id.clone(), Arc::new(service))
        })
        .collect();
    Arc::new(services)
}

/// DHCP subnet, reservation and lease operations for one server.
pub struct DhcpService {
    store: Arc<ConfStore>,
    write_lock: Arc<Mutex<()>>,
}

/// The remote files of one server and the commands that check, install and apply them.
struct ConfStore {
    server_id: String,
    paths: DhcpdConfig,
    remote: DynRemote,
}

impl DhcpService {
    #[must_use]
    pub fn new(server_id: impl Into<String>, paths: DhcpdConfig, remote: DynRemote) -> Self {
        Self {
            store: Arc::new(ConfStore {
                server_id: server_id.into(),
                paths,
                remote,
            }),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn list_subnets(&self) -> Result<Vec<Subnet>, Error> {
        Ok(self.store.load().await?.subnets)
    }

    pub async fn create_subnet(&self, spec: SubnetSpec) -> Result<Subnet, Error> {
        spec.validate()?;
        let subnet = Subnet::from_spec(spec);
        let guard = self.lock().await;
        let mut doc = self.store.load().await?;
        ensure_unique_subnet(&doc.subnets, &subnet, None)?;
        doc.subnets.push(subnet.clone());
        self.commit(doc, guard).await?;
        tracing::info!("[{}] created subnet {}", self.store.server_id, subnet.id);
        Ok(subnet)
    }

    /// Replace the subnet `id`. The result's id is derived from the new network and netmask.
    /// Statements and blocks inside the subnet that aren't modelled stay with it.
    pub async fn update_subnet(&self, id: &str, spec: SubnetSpec) -> Result<Subnet, Error> {
        spec.validate()?;
        let subnet = Subnet::from_spec(spec);
        let guard = self.lock().await;
        let mut doc = self.store.load().await?;
        let idx = doc
            .subnets
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::SubnetNotFound(id.to_string()))?;
        ensure_unique_subnet(&doc.subnets, &subnet, Some(idx))?;
        doc.subnets[idx] = subnet.clone();
        doc.rekey_subnet(id, &subnet.id);
        self.commit(doc, guard).await?;
        tracing::info!(
            "[{}] updated subnet {id} as {}",
            self.store.server_id,
            subnet.id
        );
        Ok(subnet)
    }

    pub async fn delete_subnet(&self, id: &str) -> Result<(), Error> {
        let guard = self.lock().await;
        let mut doc = self.store.load().await?;
        let before = doc.subnets.len();
        doc.subnets.retain(|s| s.id != id);
        if doc.subnets.len() == before {
            return Err(Error::SubnetNotFound(id.to_string()));
        }
        doc.subnet_extras.remove(id);
        self.commit(doc, guard).await?;
        tracing::info!("[{}] deleted subnet {id}", self.store.server_id);
        Ok(())
    }

    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, Error> {
        Ok(self.store.load().await?.reservations)
    }

    pub async fn create_reservation(&self, spec: ReservationSpec) -> Result<Reservation, Error> {
        spec.validate()?;
        let reservation = Reservation::from_spec(spec);
        let guard = self.lock().await;
        let mut doc = self.store.load().await?;
        ensure_unique_reservation(&doc.reservations, &reservation, None)?;
        doc.reservations.push(reservation.clone());
        self.commit(doc, guard).await?;
        tracing::info!(
            "[{}] created reservation {} ({})",
            self.store.server_id,
            reservation.id,
            reservation.hostname
        );
        Ok(reservation)
    }

    /// Replace the reservation `id`. The result's id is derived from the new MAC address.
    pub async fn update_reservation(
        &self,
        id: &str,
        spec: ReservationSpec,
    ) -> Result<Reservation, Error> {
        spec.validate()?;
        let reservation = Reservation::from_spec(spec);
        let guard = self.lock().await;
        let mut doc = self.store.load().await?;
        let idx = doc
            .reservations
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::ReservationNotFound(id.to_string()))?;
        ensure_unique_reservation(&doc.reservations, &reservation, Some(idx))?;
        doc.reservations[idx] = reservation.clone();
        doc.rekey_reservation(id, &reservation.id);
        self.commit(doc, guard).await?;
        tracing::info!(
            "[{}] updated reservation {id} as {}",
            self.store.server_id,
            reservation.id
        );
        Ok(reservation)
    }

    pub async fn delete_reservation(&self, id: &str) -> Result<(), Error> {
        let guard = self.lock().await;
        let mut doc = self.store.load().await?;
        let before = doc.reservations.len();
        doc.reservations.retain(|r| r.id != id);
        if doc.reservations.len() == before {
            return Err(Error::ReservationNotFound(id.to_string()));
        }
        doc.reservation_extras.remove(id);
        self.commit(doc, guard).await?;
        tracing::info!("[{}] deleted reservation {id}", self.store.server_id);
        Ok(())
    }

    pub async fn list_leases(&self) -> Result<Vec<Lease>, Error> {
        let store = &self.store;
        let text = store.remote.read_file(&store.paths.leases_path).await?;
        Ok(leases::parse_leases(&text))
    }

    async fn lock(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.write_lock).lock_owned().await
    }

    /// Save `doc` on a task of its own. The write lock is released when the save ends, even if
    /// the caller has stopped waiting for it.
    async fn commit(&self, doc: ConfDocument, guard: OwnedMutexGuard<()>) -> Result<(), Error> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let saved = store.save(&doc).await;
            drop(guard);
            saved
        })
        .await
        .map_err(|err| Error::Interrupted(err.to_string()))?
    }
}

impl ConfStore {
    async fn load(&self) -> Result<ConfDocument, Error> {
        let text = self.remote.read_file(&self.paths.conf_path).await?;
        Ok(conf::parse_document(&text))
    }

    async fn save(&self, doc: &ConfDocument) -> Result<(), Error> {
        let candidate = format!("{}.candidate", self.paths.conf_path);
        if let Err(err) = self.install(&candidate, &doc.render()).await {
            self.remove(&candidate).await;
            return Err(err);
        }

        let restart = format!("systemctl restart {}", shell_quote(&self.paths.service_name));
        let restarted = self.remote.run(&restart).await?;
        if !restarted.success() {
            tracing::error!(
                "[{}] {} failed to restart: {}",
                self.server_id,
                self.paths.service_name,
                restarted.stderr.trim()
            );
            return Err(Error::RestartFailed(restarted.stderr));
        }
        Ok(())
    }

    /// Write and check `text` as `candidate`, back up the live file, then move the candidate
    /// over it. The live file is only ever replaced by a rename.
    async fn install(&self, candidate: &str, text: &str) -> Result<(), Error> {
        let conf_path = &self.paths.conf_path;
        self.remote.write_file(candidate, text).await?;

        let check = format!(
            "{} -t -4 -cf {}",
            self.paths.check_command,
            shell_quote(candidate)
        );
        let checked = self.remote.run(&check).await?;
        if !checked.success() {
            tracing::warn!(
                "[{}] generated configuration rejected: {}",
                self.server_id,
                checked.stderr.trim()
            );
            return Err(Error::InvalidGeneratedConfig(checked.stderr));
        }

        let backup = self.backup_path()?;
        self.run_checked(&format!(
            "cp -p {} {}",
            shell_quote(conf_path),
            shell_quote(&backup)
        ))
        .await?;
        tracing::debug!("[{}] backed up {conf_path} to {backup}", self.server_id);

        self.run_checked(&format!(
            "mv -f {} {}",
            shell_quote(candidate),
            shell_quote(conf_path)
        ))
        .await
    }

    fn backup_path(&self) -> Result<String, Error> {
        let conf_path = Path::new(&self.paths.conf_path);
        let dir = match &self.paths.backup_dir {
            Some(dir) => dir.clone(),
            None => conf_path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        let file_name = conf_path
            .file_name()
            .map_or_else(|| "dhcpd.conf".into(), |f| f.to_string_lossy());
        let stamp = OffsetDateTime::now_utc().format(BACKUP_STAMP)?;
        let backup = Path::new(&dir).join(format!("{file_name}.{stamp}.bak"));
        Ok(backup.to_string_lossy().into_owned())
    }

    async fn run_checked(&self, command: &str) -> Result<(), Error> {
        let output = self.remote.run(command).await?;
        if !output.success() {
            return Err(Error::RemoteCommand {
                command: command.to_string(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Ok(())
    }

    /// Best-effort removal of a scratch file.
    async fn remove(&self, path: &str) {
        if let Err(err) = self.run_checked(&format!("rm -f {}", shell_quote(path))).await {
            tracing::warn!("[{}] could not remove {path}: {err}", self.server_id);
        }
    }
}

fn ensure_unique_subnet(
    subnets: &[Subnet],
    subnet: &Subnet,
    skip: Option<usize>,
) -> Result<(), Error> {
    let clash = subnets
        .iter()
        .enumerate()
        .any(|(i, s)| Some(i) != skip && s.id == subnet.id);
    if clash {
        return Err(Error::Conflict(format!(
            "subnet {} netmask {} already exists",
            subnet.network, subnet.netmask
        )));
    }
    Ok(())
}

fn ensure_unique_reservation(
    reservations: &[Reservation],
    reservation: &Reservation,
    skip: Option<usize>,
) -> Result<(), Error> {
    for (i, existing) in reservations.iter().enumerate() {
        if Some(i) == skip {
            continue;
        }
        if existing.hostname.eq_ignore_ascii_case(&reservation.hostname) {
            return Err(Error::Conflict(format!(
                "host {} already exists",
                reservation.hostname
            )));
        }
        if existing.has_mac(&reservation.mac) {
            return Err(Error::Conflict(format!(
                "MAC address {} is already reserved by {}",
                reservation.mac, existing.hostname
            )));
        }
    }
    Ok(())
}
