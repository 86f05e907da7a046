use num_enum::TryFromPrimitive;
use std::convert::TryFrom;

pub const MAX_VOLUMES: u8 = 10;

// Role of a game file, or the kind of resource stored in it. The numbered
// volumes come first so that a volume index maps directly onto its role.
#[derive(TryFromPrimitive)]
#[derive(Debug,PartialEq,Eq,PartialOrd,Ord,Hash,Clone,Copy)]
#[repr(u8)]
pub enum ResourceType {
    Volume0 = 0,
    Volume1 = 1,
    Volume2 = 2,
    Volume3 = 3,
    Volume4 = 4,
    Volume5 = 5,
    Volume6 = 6,
    Volume7 = 7,
    Volume8 = 8,
    Volume9 = 9,
    Directory = 10,
    Logic = 11,
    Picture = 12,
    Sound = 13,
    View = 14,
    Objects = 15,
    Words = 16,
}

#[derive(PartialEq,Eq,Hash,Clone,Copy,Debug)]
pub struct ResourceID {
    pub rtype: ResourceType,
    pub num: u16,
}

impl ResourceType {
    pub fn volume(index: u8) -> Option<ResourceType> {
        if index < MAX_VOLUMES {
            ResourceType::try_from(index).ok()
        } else {
            None
        }
    }

    pub fn volume_index(self) -> Option<u8> {
        let n = self as u8;
        if n < MAX_VOLUMES { Some(n) } else { None }
    }

    pub fn is_indexed(self) -> bool {
        matches!(self, ResourceType::Logic | ResourceType::Picture | ResourceType::Sound | ResourceType::View)
    }
}

pub fn resource_type_to_str(id: ResourceType) -> &'static str {
    match id {
        ResourceType::Volume0 => "vol.0",
        ResourceType::Volume1 => "vol.1",
        ResourceType::Volume2 => "vol.2",
        ResourceType::Volume3 => "vol.3",
        ResourceType::Volume4 => "vol.4",
        ResourceType::Volume5 => "vol.5",
        ResourceType::Volume6 => "vol.6",
        ResourceType::Volume7 => "vol.7",
        ResourceType::Volume8 => "vol.8",
        ResourceType::Volume9 => "vol.9",
        ResourceType::Directory => "dir",
        ResourceType::Logic => "logic",
        ResourceType::Picture => "pic",
        ResourceType::Sound => "sound",
        ResourceType::View => "view",
        ResourceType::Objects => "object",
        ResourceType::Words => "words",
    }
}

pub fn u8_to_resource_type(rtype: u8) -> Option<ResourceType> {
    ResourceType::try_from(rtype).ok()
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(resource_type_to_str(*self))
    }
}

impl std::fmt::Display for ResourceID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:03}", resource_type_to_str(self.rtype), self.num)
    }
}
