//! Plot server GUI state beans.

use super::{field, i32_field, optional_field, put, wrong_field, Bean, Dataset};
use crate::flatten::RootFlattener;
use crate::native_object;
use crate::value::{ObjectArray, Type, Value};
use crate::wire::{Record, CONTENT, TYPE_KEY};
use crate::{Result, RpcError};
use std::collections::BTreeMap;

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:expr),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),*
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                Self::ALL.iter().copied().find(|v| v.as_str() == s)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl Bean for $name {
            const TYPE_NAME: &'static str =
                concat!("uk.ac.diamond.scisoft.analysis.plotserver.", stringify!($name));

            fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
                put(record, CONTENT, self.as_str(), root)
            }

            fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
                let content = field(record, CONTENT, root)?;
                content
                    .as_str()
                    .and_then(Self::parse)
                    .ok_or_else(|| wrong_field(record, CONTENT, stringify!($name), &content))
            }
        }

        native_object!($name, <$name as Bean>::TYPE_NAME);
    };
}

named_enum!(
    /// Keys of a [`GuiBean`].
    GuiParameters {
        PlotMode => "PlotMode",
        Title => "Title",
        Roi => "ROI",
        RoiList => "ROIList",
        PlotId => "PlotID",
        PlotOp => "PlotOp",
        FileName => "FileName",
        FileList => "FileList",
        FileOp => "FileOp",
        DispFileOnView => "DispFileOnView",
        GridXPos => "GridXPos",
        GridYPos => "GridYPos",
        GridSize => "GridSize",
        MetaDataNodePath => "MetaDataNodePath",
        TreeData => "TreeData",
        QuietUpdate => "QuietUpdate",
    }
);

named_enum!(
    /// Plot kinds a plot view can show.
    GuiPlotMode {
        OneD => "ONED",
        OneDThreeD => "ONED_THREED",
        TwoD => "TWOD",
        Surf2D => "SURF2D",
        Scatter2D => "SCATTER2D",
        Scatter3D => "SCATTER3D",
        Multi2D => "MULTI2D",
        Empty => "EMPTY",
    }
);

/// GUI state keyed by [`GuiParameters`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GuiBean(BTreeMap<GuiParameters, Value>);

impl GuiBean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: GuiParameters, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key, value.into())
    }

    pub fn get(&self, key: GuiParameters) -> Option<&Value> {
        self.0.get(&key)
    }

    pub fn remove(&mut self, key: GuiParameters) -> Option<Value> {
        self.0.remove(&key)
    }

    pub fn contains(&self, key: GuiParameters) -> bool {
        self.0.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&GuiParameters, &Value)> {
        self.0.iter()
    }
}

native_object!(GuiBean, GuiBean::TYPE_NAME);

impl Bean for GuiBean {
    const TYPE_NAME: &'static str = "uk.ac.diamond.scisoft.analysis.plotserver.GuiBean";

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        for (key, value) in &self.0 {
            put(record, key.as_str(), value.clone(), root)?;
        }
        Ok(())
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        let mut bean = GuiBean::new();
        for (key, wire) in record.iter().filter(|(k, _)| k.as_str() != TYPE_KEY) {
            let param = GuiParameters::parse(key).ok_or_else(|| {
                RpcError::malformed(format!("unknown GUI parameter '{}'", key))
            })?;
            let value = match (param, root.unflatten(wire)?) {
                // Dynamic clients send these as plain text.
                (GuiParameters::PlotId, Value::Str(text)) => {
                    uuid::Uuid::parse_str(&text).map(Value::Uuid).map_err(|e| {
                        RpcError::malformed(format!("invalid PlotID '{}': {}", text, e))
                    })?
                }
                (GuiParameters::PlotMode, Value::Str(text)) => GuiPlotMode::parse(&text)
                    .map(Value::object)
                    .ok_or_else(|| RpcError::malformed(format!("invalid PlotMode '{}'", text)))?,
                (_, value) => value,
            };
            bean.0.insert(param, value);
        }
        Ok(bean)
    }
}

/// Axis names for each dimension of a dataset.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AxisMapBean {
    pub axis_id: Vec<String>,
    pub map_mode: i32,
}

impl AxisMapBean {
    pub const DIRECT: i32 = 0;
    pub const FULL: i32 = 1;
}

native_object!(AxisMapBean, AxisMapBean::TYPE_NAME);

const AXIS_ID: &str = "axisID";
const MAP_MODE: &str = "mapMode";

impl Bean for AxisMapBean {
    const TYPE_NAME: &'static str = "uk.ac.diamond.scisoft.analysis.plotserver.AxisMapBean";

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        put(record, AXIS_ID, self.axis_id.clone(), root)?;
        put(record, MAP_MODE, self.map_mode, root)
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        let ids = optional_field(record, AXIS_ID, root)?;
        let axis_id = match &ids {
            Value::Null | Value::TypedNone(_) => Vec::new(),
            Value::Array(array) => strings(record, AXIS_ID, &array.items, &ids)?,
            Value::List(items) => strings(record, AXIS_ID, items, &ids)?,
            other => return Err(wrong_field(record, AXIS_ID, "a string array", other)),
        };
        Ok(Self {
            axis_id,
            map_mode: i32_field(record, MAP_MODE, root)?,
        })
    }
}

fn strings(record: &Record, key: &str, items: &[Value], whole: &Value) -> Result<Vec<String>> {
    items
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| wrong_field(record, key, "a string array", whole))
}

/// A dataset with the axis names it is plotted against.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSetWithAxisInformation {
    pub data: Dataset,
    pub axis_map: AxisMapBean,
}

native_object!(DataSetWithAxisInformation, DataSetWithAxisInformation::TYPE_NAME);

const DATA: &str = "data";
const AXIS_MAP: &str = "axisMap";
const AXIS_DATA: &str = "axisData";

impl Bean for DataSetWithAxisInformation {
    const TYPE_NAME: &'static str =
        "uk.ac.diamond.scisoft.analysis.plotserver.DataSetWithAxisInformation";

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        put(record, DATA, Value::object(self.data.clone()), root)?;
        put(record, AXIS_MAP, Value::object(self.axis_map.clone()), root)
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        let data = field(record, DATA, root)?;
        let axis_map = field(record, AXIS_MAP, root)?;
        Ok(Self {
            data: data
                .downcast_ref::<Dataset>()
                .cloned()
                .ok_or_else(|| wrong_field(record, DATA, Dataset::TYPE_NAME, &data))?,
            axis_map: axis_map
                .downcast_ref::<AxisMapBean>()
                .cloned()
                .ok_or_else(|| wrong_field(record, AXIS_MAP, AxisMapBean::TYPE_NAME, &axis_map))?,
        })
    }
}

/// Plot data: datasets plus named axis datasets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataBean {
    pub data: Vec<DataSetWithAxisInformation>,
    pub axis_data: BTreeMap<String, Dataset>,
}

native_object!(DataBean, DataBean::TYPE_NAME);

impl Bean for DataBean {
    const TYPE_NAME: &'static str = "uk.ac.diamond.scisoft.analysis.plotserver.DataBean";

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        let data = ObjectArray::new(
            Type::named(DataSetWithAxisInformation::TYPE_NAME),
            self.data.iter().cloned().map(Value::object).collect(),
        );
        let axis_data: BTreeMap<String, Value> = self
            .axis_data
            .iter()
            .map(|(k, v)| (k.clone(), Value::object(v.clone())))
            .collect();
        put(record, DATA, data, root)?;
        put(record, AXIS_DATA, axis_data, root)
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        let data_value = field(record, DATA, root)?;
        let items: &[Value] = match &data_value {
            Value::Array(array) => &array.items,
            Value::List(items) => items,
            other => return Err(wrong_field(record, DATA, "an array", other)),
        };
        let data = items
            .iter()
            .map(|item| {
                item.downcast_ref::<DataSetWithAxisInformation>()
                    .cloned()
                    .ok_or_else(|| {
                        wrong_field(record, DATA, DataSetWithAxisInformation::TYPE_NAME, item)
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let axis_value = field(record, AXIS_DATA, root)?;
        let axis_data = match &axis_value {
            Value::Map(map) => map
                .iter()
                .map(|(k, v)| {
                    v.downcast_ref::<Dataset>()
                        .cloned()
                        .map(|d| (k.clone(), d))
                        .ok_or_else(|| wrong_field(record, AXIS_DATA, Dataset::TYPE_NAME, v))
                })
                .collect::<Result<BTreeMap<_, _>>>()?,
            other => return Err(wrong_field(record, AXIS_DATA, "a map", other)),
        };
        Ok(Self { data, axis_data })
    }
}
