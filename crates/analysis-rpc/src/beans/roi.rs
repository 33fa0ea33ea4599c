//! Regions of interest.
//!
//! Only the record layout matters here; geometry lives with the plotting
//! code. All ROI records share `name`, `spt` (start point) and `plot`.

use super::{
    bool_field, f64_field, f64_vec_field, field, i32_field, opt_string_field, pair_field, put,
    wrong_field, Bean,
};
use crate::flatten::RootFlattener;
use crate::native_object;
use crate::value::{ObjectArray, Type, Value};
use crate::wire::{Record, CONTENT};
use crate::Result;

const ROI_BASE: &str = "uk.ac.diamond.scisoft.analysis.roi.ROIBase";

const NAME: &str = "name";
const SPT: &str = "spt";
const PLOT: &str = "plot";
const LEN: &str = "len";
const ANG: &str = "ang";
const RAD: &str = "rad";
const CLIPPING_COMPENSATION: &str = "clippingCompensation";
const SYMMETRY: &str = "symmetry";
const COMBINE_SYMMETRY: &str = "combineSymmetry";
const AVERAGE_AREA: &str = "averageArea";
const CROSS_HAIR: &str = "crossHair";

/// Fields common to every ROI.
#[derive(Debug, Clone, PartialEq)]
pub struct RoiBase {
    pub name: Option<String>,
    pub spt: Vec<f64>,
    pub plot: bool,
}

impl Default for RoiBase {
    fn default() -> Self {
        Self {
            name: None,
            spt: vec![0.0, 0.0],
            plot: false,
        }
    }
}

impl RoiBase {
    pub fn at(spt: [f64; 2]) -> Self {
        Self {
            spt: spt.to_vec(),
            ..Self::default()
        }
    }

    fn write(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        put(record, NAME, self.name.clone(), root)?;
        put(record, SPT, self.spt.clone(), root)?;
        put(record, PLOT, self.plot, root)
    }

    fn read(record: &Record, root: &RootFlattener) -> Result<Self> {
        Ok(Self {
            name: opt_string_field(record, NAME, root)?,
            spt: f64_vec_field(record, SPT, root)?,
            plot: bool_field(record, PLOT, root)?,
        })
    }
}

native_object!(RoiBase, ROI_BASE);

impl Bean for RoiBase {
    const TYPE_NAME: &'static str = ROI_BASE;

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        self.write(record, root)
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        Self::read(record, root)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RectangularRoi {
    pub base: RoiBase,
    /// Width and height.
    pub len: [f64; 2],
    /// Rotation angle in radians.
    pub ang: f64,
    pub clipping_compensation: bool,
}

native_object!(
    RectangularRoi,
    RectangularRoi::TYPE_NAME,
    [ROI_BASE]
);

impl Bean for RectangularRoi {
    const TYPE_NAME: &'static str = "uk.ac.diamond.scisoft.analysis.roi.RectangularROI";

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        self.base.write(record, root)?;
        put(record, LEN, self.len.to_vec(), root)?;
        put(record, ANG, self.ang, root)?;
        put(record, CLIPPING_COMPENSATION, self.clipping_compensation, root)
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        Ok(Self {
            base: RoiBase::read(record, root)?,
            len: pair_field(record, LEN, root)?,
            ang: f64_field(record, ANG, root)?,
            clipping_compensation: bool_field(record, CLIPPING_COMPENSATION, root)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SectorRoi {
    pub base: RoiBase,
    /// Inner and outer radius.
    pub rad: [f64; 2],
    /// Start and end angle in radians.
    pub ang: [f64; 2],
    pub symmetry: i32,
    pub combine_symmetry: bool,
    pub clipping_compensation: bool,
    pub average_area: bool,
}

native_object!(SectorRoi, SectorRoi::TYPE_NAME, [ROI_BASE]);

impl Bean for SectorRoi {
    const TYPE_NAME: &'static str = "uk.ac.diamond.scisoft.analysis.roi.SectorROI";

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        self.base.write(record, root)?;
        put(record, RAD, self.rad.to_vec(), root)?;
        put(record, ANG, self.ang.to_vec(), root)?;
        put(record, SYMMETRY, self.symmetry, root)?;
        put(record, COMBINE_SYMMETRY, self.combine_symmetry, root)?;
        put(record, CLIPPING_COMPENSATION, self.clipping_compensation, root)?;
        put(record, AVERAGE_AREA, self.average_area, root)
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        Ok(Self {
            base: RoiBase::read(record, root)?,
            rad: pair_field(record, RAD, root)?,
            ang: pair_field(record, ANG, root)?,
            symmetry: i32_field(record, SYMMETRY, root)?,
            combine_symmetry: bool_field(record, COMBINE_SYMMETRY, root)?,
            clipping_compensation: bool_field(record, CLIPPING_COMPENSATION, root)?,
            average_area: bool_field(record, AVERAGE_AREA, root)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinearRoi {
    pub base: RoiBase,
    pub len: f64,
    pub ang: f64,
    pub cross_hair: bool,
}

native_object!(LinearRoi, LinearRoi::TYPE_NAME, [ROI_BASE]);

impl Bean for LinearRoi {
    const TYPE_NAME: &'static str = "uk.ac.diamond.scisoft.analysis.roi.LinearROI";

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        self.base.write(record, root)?;
        put(record, LEN, self.len, root)?;
        put(record, ANG, self.ang, root)?;
        put(record, CROSS_HAIR, self.cross_hair, root)
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        Ok(Self {
            base: RoiBase::read(record, root)?,
            len: f64_field(record, LEN, root)?,
            ang: f64_field(record, ANG, root)?,
            cross_hair: bool_field(record, CROSS_HAIR, root)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CircularRoi {
    pub base: RoiBase,
    pub rad: f64,
}

native_object!(CircularRoi, CircularRoi::TYPE_NAME, [ROI_BASE]);

impl Bean for CircularRoi {
    const TYPE_NAME: &'static str = "uk.ac.diamond.scisoft.analysis.roi.CircularROI";

    fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
        self.base.write(record, root)?;
        put(record, RAD, self.rad, root)
    }

    fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
        Ok(Self {
            base: RoiBase::read(record, root)?,
            rad: f64_field(record, RAD, root)?,
        })
    }
}

macro_rules! roi_list {
    ($list:ident, $roi:ty, $name:expr) => {
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct $list(pub Vec<$roi>);

        native_object!($list, $list::TYPE_NAME);

        impl Bean for $list {
            const TYPE_NAME: &'static str = $name;

            fn write_fields(&self, record: &mut Record, root: &RootFlattener) -> Result<()> {
                let items = self.0.iter().cloned().map(Value::object).collect();
                put(
                    record,
                    CONTENT,
                    ObjectArray::new(Type::named(<$roi>::TYPE_NAME), items),
                    root,
                )
            }

            fn read_fields(record: &Record, root: &RootFlattener) -> Result<Self> {
                let content = field(record, CONTENT, root)?;
                let items = match &content {
                    Value::Array(array) => &array.items,
                    Value::List(items) => items,
                    other => return Err(wrong_field(record, CONTENT, "an array", other)),
                };
                items
                    .iter()
                    .map(|item| {
                        item.downcast_ref::<$roi>()
                            .cloned()
                            .ok_or_else(|| wrong_field(record, CONTENT, <$roi>::TYPE_NAME, item))
                    })
                    .collect::<Result<Vec<_>>>()
                    .map($list)
            }
        }
    };
}

roi_list!(
    RectangularRoiList,
    RectangularRoi,
    "uk.ac.diamond.scisoft.analysis.roi.RectangularROIList"
);
roi_list!(
    SectorRoiList,
    SectorRoi,
    "uk.ac.diamond.scisoft.analysis.roi.SectorROIList"
);
roi_list!(
    LinearRoiList,
    LinearRoi,
    "uk.ac.diamond.scisoft.analysis.roi.LinearROIList"
);
