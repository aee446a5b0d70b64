//! VM inventory and the volume-to-VM reverse index.

use std::collections::HashMap;

use serde::Deserialize;

/// Wire shape of one VM from the inventory-listing endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmInventory {
    /// VM identifier.
    pub uuid: String,

    /// CPU count.
    #[serde(default)]
    pub cpu_num: Option<i64>,

    /// Memory size in bytes.
    #[serde(default)]
    pub memory_size: Option<i64>,

    /// All volumes attached to the VM, root volume included.
    #[serde(default)]
    pub all_volumes: Vec<VolumeInventory>,
}

/// Wire shape of one attached volume.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInventory {
    /// Volume identifier.
    pub uuid: String,

    /// Volume size in bytes.
    #[serde(default)]
    pub size: Option<i64>,
}

/// One VM with its sizing context, used to enrich billing records.
#[derive(Debug, Clone)]
pub struct VmRecord {
    /// VM identifier.
    pub uuid: String,

    /// CPU count.
    pub cpu_num: Option<i64>,

    /// Memory size in bytes.
    pub memory_bytes: Option<i64>,

    /// Attached volume sizes in bytes, keyed by volume uuid.
    pub volumes: HashMap<String, i64>,
}

/// The full VM inventory with a volume-to-owning-VM reverse index, built
/// once per run.
#[derive(Debug, Clone, Default)]
pub struct VmTopology {
    vms: HashMap<String, VmRecord>,
    volume_to_vm: HashMap<String, String>,
}

impl VmTopology {
    /// Build the topology from the raw inventory listing.
    #[must_use]
    pub fn from_inventory(inventory: Vec<VmInventory>) -> Self {
        let mut vms = HashMap::with_capacity(inventory.len());
        let mut volume_to_vm = HashMap::new();

        for vm in inventory {
            let mut volumes = HashMap::with_capacity(vm.all_volumes.len());
            for volume in &vm.all_volumes {
                volume_to_vm.insert(volume.uuid.clone(), vm.uuid.clone());
                if let Some(size) = volume.size {
                    volumes.insert(volume.uuid.clone(), size);
                }
            }
            vms.insert(
                vm.uuid.clone(),
                VmRecord {
                    uuid: vm.uuid,
                    cpu_num: vm.cpu_num,
                    memory_bytes: vm.memory_size,
                    volumes,
                },
            );
        }

        Self { vms, volume_to_vm }
    }

    /// Look up a VM by its own uuid.
    #[must_use]
    pub fn vm(&self, uuid: &str) -> Option<&VmRecord> {
        self.vms.get(uuid)
    }

    /// Look up the VM owning the given volume.
    #[must_use]
    pub fn vm_for_volume(&self, volume_uuid: &str) -> Option<&VmRecord> {
        self.volume_to_vm
            .get(volume_uuid)
            .and_then(|vm_uuid| self.vms.get(vm_uuid))
    }

    /// Number of VMs in the topology.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vms.len()
    }

    /// Whether the topology holds no VMs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> VmTopology {
        let inventory: Vec<VmInventory> = serde_json::from_value(json!([
            {
                "uuid": "vm-1",
                "cpuNum": 2,
                "memorySize": 4_294_967_296_i64,
                "allVolumes": [
                    { "uuid": "vol-root", "size": 21_474_836_480_i64 },
                    { "uuid": "vol-data", "size": 107_374_182_400_i64 }
                ]
            },
            { "uuid": "vm-2", "cpuNum": 4, "memorySize": 8_589_934_592_i64 }
        ]))
        .unwrap();
        VmTopology::from_inventory(inventory)
    }

    #[test]
    fn direct_vm_lookup() {
        let topology = sample();
        let vm = topology.vm("vm-1").unwrap();
        assert_eq!(vm.cpu_num, Some(2));
        assert_eq!(vm.volumes.get("vol-data"), Some(&107_374_182_400));
    }

    #[test]
    fn reverse_index_resolves_owner() {
        let topology = sample();
        let owner = topology.vm_for_volume("vol-data").unwrap();
        assert_eq!(owner.uuid, "vm-1");
        assert!(topology.vm_for_volume("vol-unknown").is_none());
    }

    #[test]
    fn vm_without_volumes_parses() {
        let topology = sample();
        assert_eq!(topology.len(), 2);
        assert!(topology.vm("vm-2").unwrap().volumes.is_empty());
    }
}
